//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::mpd::{self, ConnectOptions};
use crate::watcher::{RetryConfig, WatcherConfig};

/// Environment prefix for all settings (`MPDW_MPD__HOST`, `MPDW_WATCHER__POLL_INTERVAL_MS`, ...)
const ENV_PREFIX: &str = "MPDW";

const APP_DIR_NAME: &str = "mpd-watch";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mpd: MpdSettings,
    #[serde(default)]
    pub watcher: WatcherSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpdSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    mpd::DEFAULT_PORT
}

impl Default for MpdSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherSettings {
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub max_retry_delay_ms: u64,
    /// Unset means socket I/O may wait indefinitely.
    #[serde(default)]
    pub io_timeout_ms: Option<u64>,
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_interval_ms(),
            retry_delay_ms: default_interval_ms(),
            max_retry_delay_ms: default_interval_ms(),
            io_timeout_ms: None,
        }
    }
}

impl Config {
    /// `host:port` of the MPD server.
    pub fn addr(&self) -> String {
        mpd::address(&self.mpd.host, self.mpd.port)
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            io_timeout: self.watcher.io_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: Duration::from_millis(self.watcher.poll_interval_ms),
            retry: RetryConfig::new(
                Duration::from_millis(self.watcher.retry_delay_ms),
                Duration::from_millis(self.watcher.max_retry_delay_ms),
            ),
            connect: self.connect_options(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mpd.host.trim().is_empty() {
            bail!("mpd.host must not be empty");
        }
        if self.mpd.port == 0 {
            bail!("mpd.port must not be 0");
        }
        let watcher = &self.watcher;
        if watcher.poll_interval_ms == 0 {
            bail!("watcher.poll_interval_ms must be greater than 0");
        }
        if watcher.retry_delay_ms == 0 {
            bail!("watcher.retry_delay_ms must be greater than 0");
        }
        if watcher.max_retry_delay_ms < watcher.retry_delay_ms {
            bail!(
                "watcher.max_retry_delay_ms ({}) must be at least watcher.retry_delay_ms ({})",
                watcher.max_retry_delay_ms,
                watcher.retry_delay_ms
            );
        }
        if watcher.io_timeout_ms == Some(0) {
            bail!("watcher.io_timeout_ms must be greater than 0 when set");
        }
        Ok(())
    }
}

/// Get config directory (MPDW_CONFIG_DIR, XDG_CONFIG_HOME or ~/.config)
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MPDW_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join(APP_DIR_NAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join(APP_DIR_NAME);
    }

    PathBuf::from(".")
}

/// Command-line values layered above every other source
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Load settings: defaults, then `<config dir>/config.*`, then `MPDW_*`
/// variables, then the conventional `MPD_HOST`/`MPD_PORT`.
pub fn load_config() -> Result<Config> {
    load_config_with(Overrides::default())
}

/// Same as [`load_config`] with command-line overrides applied last.
/// Validation runs once, on the merged result.
pub fn load_config_with(overrides: Overrides) -> Result<Config> {
    let config_dir = get_config_dir();
    let defaults = Config::default();

    let mut builder = ::config::Config::builder()
        .set_default("mpd.host", defaults.mpd.host)?
        .set_default("mpd.port", defaults.mpd.port as i64)?
        .set_default("watcher.poll_interval_ms", defaults.watcher.poll_interval_ms as i64)?
        .set_default("watcher.retry_delay_ms", defaults.watcher.retry_delay_ms as i64)?
        .set_default("watcher.max_retry_delay_ms", defaults.watcher.max_retry_delay_ms as i64)?
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    // MPD's own client convention; a socket path or password@host form is not supported
    if let Ok(host) = std::env::var("MPD_HOST") {
        if host.starts_with('/') || host.contains('@') {
            tracing::warn!("Ignoring unsupported MPD_HOST value {:?}", host);
        } else if !host.is_empty() {
            builder = builder.set_override("mpd.host", host)?;
        }
    }
    if let Ok(port) = std::env::var("MPD_PORT") {
        match port.parse::<u16>() {
            Ok(port_num) => builder = builder.set_override("mpd.port", port_num as i64)?,
            Err(_) => tracing::warn!("Ignoring invalid MPD_PORT value {:?}", port),
        }
    }
    if let Some(host) = overrides.host {
        builder = builder.set_override("mpd.host", host)?;
    }
    if let Some(port) = overrides.port {
        builder = builder.set_override("mpd.port", port as i64)?;
    }

    let config: Config = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
