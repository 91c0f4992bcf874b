//! mpd-watch - MPD status watcher and one-shot control CLI

use mpd_watch::bus::{self, MpdEvent, SharedBus};
use mpd_watch::config;
use mpd_watch::mpd::{MpdController, Status};
use mpd_watch::status::StatusSlot;
use mpd_watch::watcher::StatusWatcher;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mpd-watch", version = env!("MPDW_VERSION"), about)]
struct Cli {
    /// MPD host (overrides config and MPD_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// MPD port (overrides config and MPD_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Keep polling the server and log every status change (default)
    Watch,
    /// Print the current status once
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start playback, optionally at a queue position
    Play { position: Option<u32> },
    /// Start playback, optionally at a song id
    PlayId { id: Option<u32> },
    Pause,
    Resume,
    /// Pause when playing, resume otherwise
    Toggle,
    Next,
    Previous,
    Random {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        value: u8,
    },
    Repeat {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        value: u8,
    },
    Single {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        value: u8,
    },
    /// List values of a tag, optionally filtered by `<tag> <value>` pairs
    List {
        tag: String,
        filters: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "mpd_watch=debug"
    } else {
        "mpd_watch=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(
        "mpd-watch v{} ({})",
        env!("MPDW_VERSION"),
        env!("MPDW_GIT_SHA")
    );

    let config = config::load_config_with(config::Overrides {
        host: cli.host,
        port: cli.port,
    })?;
    let addr = config.addr();

    let command = cli.command.unwrap_or(Command::Watch);
    if let Command::Watch = command {
        return watch(addr, config).await;
    }

    let slot = StatusSlot::new();
    let controller =
        MpdController::new(addr, slot.clone()).with_options(config.connect_options());
    let result = run_command(&controller, &slot, command).await;
    controller.close().await;
    result
}

async fn run_command(controller: &MpdController, slot: &StatusSlot, command: Command) -> Result<()> {
    match command {
        Command::Watch => bail!("watch is not a one-shot command"),
        Command::Status { json } => {
            let status = controller.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
        Command::Play { position } => controller.play(position).await?,
        Command::PlayId { id } => controller.play_id(id).await?,
        Command::Pause => controller.pause(true).await?,
        Command::Resume => controller.pause(false).await?,
        Command::Toggle => {
            slot.publish(controller.status().await?);
            let paused = controller.toggle_pause().await?;
            println!("{}", if paused { "paused" } else { "resumed" });
        }
        Command::Next => controller.next().await?,
        Command::Previous => controller.previous().await?,
        Command::Random { value } => controller.random(value == 1).await?,
        Command::Repeat { value } => controller.repeat(value == 1).await?,
        Command::Single { value } => controller.single(value == 1).await?,
        Command::List { tag, filters } => {
            if filters.len() % 2 != 0 {
                bail!("filters must be <tag> <value> pairs");
            }
            let pairs: Vec<(&str, &str)> = filters
                .chunks(2)
                .map(|pair| (pair[0].as_str(), pair[1].as_str()))
                .collect();
            for value in controller.list(&tag, &pairs).await? {
                println!("{}", value);
            }
        }
    }
    Ok(())
}

fn print_status(status: &Status) {
    println!("state:    {}", status.state);
    if status.has_current_song() {
        println!("song:     {} - {} ({})", status.artist, status.title, status.album);
        println!(
            "time:     {:.0}/{}s  bitrate {} kbps",
            status.elapsed, status.duration, status.bitrate
        );
    }
    println!("volume:   {}", status.volume);
    println!(
        "repeat: {}  random: {}  single: {}  consume: {}",
        on_off(status.repeat),
        on_off(status.random),
        on_off(status.single),
        on_off(status.consume)
    );
    if !status.error.is_empty() {
        println!("error:    {}", status.error);
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

async fn watch(addr: String, config: config::Config) -> Result<()> {
    tracing::info!(
        "Starting mpd-watch v{} ({}) against {}",
        env!("MPDW_VERSION"),
        env!("MPDW_GIT_SHA"),
        addr
    );

    let bus = bus::create_bus();
    let slot = StatusSlot::new();
    let shutdown = CancellationToken::new();

    let reporter = spawn_status_reporter(bus.clone(), slot.clone(), shutdown.clone());
    let watcher = StatusWatcher::new(addr, config.watcher_config(), slot, bus).spawn(shutdown.clone());

    shutdown_signal().await;
    shutdown.cancel();

    if let Err(e) = watcher.await {
        tracing::warn!("Watcher task failed: {}", e);
    }
    if let Err(e) = reporter.await {
        tracing::warn!("Reporter task failed: {}", e);
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Log a line whenever the published player state or song changes.
fn spawn_status_reporter(
    bus: SharedBus,
    slot: StatusSlot,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        let mut last: Option<(String, String)> = None;
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => event,
            };
            match event {
                Ok(MpdEvent::StatusUpdated { .. }) => {
                    let Some(status) = slot.read() else { continue };
                    let key = (status.state.clone(), status.title.clone());
                    if last.as_ref() != Some(&key) {
                        tracing::info!(
                            "{} {} - {} (volume {})",
                            status.state,
                            status.artist,
                            status.title,
                            status.volume
                        );
                        last = Some(key);
                    }
                }
                Ok(MpdEvent::Disconnected { addr, reason }) => {
                    tracing::warn!("Lost MPD at {}: {}", addr, reason);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Status reporter skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_watch() {
        let cli = Cli::try_parse_from(["mpd-watch"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_switch_rejects_out_of_range() {
        assert!(Cli::try_parse_from(["mpd-watch", "random", "2"]).is_err());
        let cli = Cli::try_parse_from(["mpd-watch", "--port", "6601", "repeat", "1"]).unwrap();
        assert_eq!(cli.port, Some(6601));
        assert!(matches!(cli.command, Some(Command::Repeat { value: 1 })));
    }

    #[test]
    fn test_play_id_takes_optional_id() {
        let cli = Cli::try_parse_from(["mpd-watch", "play-id", "17"]).unwrap();
        assert!(matches!(cli.command, Some(Command::PlayId { id: Some(17) })));
        let cli = Cli::try_parse_from(["mpd-watch", "play-id"]).unwrap();
        assert!(matches!(cli.command, Some(Command::PlayId { id: None })));
    }

    #[test]
    fn test_list_collects_filters() {
        let cli =
            Cli::try_parse_from(["mpd-watch", "list", "album", "artist", "Daft Punk"]).unwrap();
        match cli.command {
            Some(Command::List { tag, filters }) => {
                assert_eq!(tag, "album");
                assert_eq!(filters, vec!["artist", "Daft Punk"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
