//! High-level MPD client with command methods.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::connection::{ConnectOptions, Connection};
use super::error::{CommandError, ConnectError};
use super::protocol::Command;
use super::response::{
    decode_list, decode_song_with, decode_status_with, parse_record, Song, Status,
};
use crate::bus::{MpdEvent, SharedBus};

/// MPD client owning one connection.
pub struct MpdClient<S = TcpStream> {
    conn: Connection<S>,
    bus: Option<SharedBus>,
}

impl MpdClient<TcpStream> {
    /// Connect to MPD at `addr` (`host:port`).
    pub async fn connect(addr: &str) -> Result<Self, ConnectError> {
        Ok(Self::from_connection(Connection::connect(addr).await?))
    }

    pub async fn connect_with(addr: &str, options: ConnectOptions) -> Result<Self, ConnectError> {
        Ok(Self::from_connection(
            Connection::connect_with(addr, options).await?,
        ))
    }
}

impl<S> MpdClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn from_connection(conn: Connection<S>) -> Self {
        Self { conn, bus: None }
    }

    /// Report decode diagnostics and metadata failures on `bus`.
    pub fn with_events(mut self, bus: SharedBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn addr(&self) -> &str {
        self.conn.addr()
    }

    pub fn server_version(&self) -> &str {
        self.conn.server_version()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_open()
    }

    /// Disconnect from the server. Safe to call more than once.
    pub async fn close(&mut self) {
        self.conn.close().await
    }

    /// Send a command and return its raw reply lines.
    pub async fn execute(&mut self, command: &Command) -> Result<Vec<String>, CommandError> {
        self.conn.execute(command).await
    }

    /// Send a command whose reply carries no payload.
    async fn send(&mut self, command: Command) -> Result<(), CommandError> {
        let lines = self.conn.execute(&command).await?;
        if !lines.is_empty() {
            debug!("MPD {}: ignoring {} reply lines", command.name(), lines.len());
        }
        Ok(())
    }

    /// Fetch the player status.
    ///
    /// When a song is playing or paused its metadata is fetched with a second
    /// `currentsong` query. That query failing only leaves the metadata empty;
    /// the status itself is still returned.
    pub async fn status(&mut self) -> Result<Status, CommandError> {
        let record = parse_record(&self.conn.execute(&Command::status()).await?);
        let mut status = decode_status_with(&record, invalid_field_reporter(&self.bus, "status"));

        if status.has_current_song() {
            match self.current_song().await {
                Ok(song) => status.apply_song(&song),
                Err(e) => {
                    warn!("MPD: could not get current song: {}", e);
                    if let Some(bus) = &self.bus {
                        bus.publish(MpdEvent::MetadataFetchFailed {
                            addr: self.conn.addr().to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(status)
    }

    /// Fetch metadata of the current song.
    pub async fn current_song(&mut self) -> Result<Song, CommandError> {
        let record = parse_record(&self.conn.execute(&Command::current_song()).await?);
        Ok(decode_song_with(
            &record,
            invalid_field_reporter(&self.bus, "currentsong"),
        ))
    }

    /// Values of `tag`, optionally narrowed by `(filter tag, value)` pairs.
    ///
    /// `list("album", &[("artist", "Daft Punk")])` returns albums by Daft Punk.
    pub async fn list(
        &mut self,
        tag: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<String>, CommandError> {
        let lines = self.conn.execute(&Command::list(tag, filters)).await?;
        Ok(decode_list(&lines, tag))
    }

    /// Start playback, at queue position `position` if given.
    pub async fn play(&mut self, position: Option<u32>) -> Result<(), CommandError> {
        self.send(Command::play(position)).await
    }

    /// Start playback of the song with queue id `id` if given.
    pub async fn play_id(&mut self, id: Option<u32>) -> Result<(), CommandError> {
        self.send(Command::play_id(id)).await
    }

    /// Pass true to pause, false to resume.
    pub async fn pause(&mut self, paused: bool) -> Result<(), CommandError> {
        self.send(Command::pause(paused)).await
    }

    pub async fn random(&mut self, enabled: bool) -> Result<(), CommandError> {
        self.send(Command::random(enabled)).await
    }

    pub async fn repeat(&mut self, enabled: bool) -> Result<(), CommandError> {
        self.send(Command::repeat(enabled)).await
    }

    pub async fn single(&mut self, enabled: bool) -> Result<(), CommandError> {
        self.send(Command::single(enabled)).await
    }

    pub async fn next(&mut self) -> Result<(), CommandError> {
        self.send(Command::next()).await
    }

    pub async fn previous(&mut self) -> Result<(), CommandError> {
        self.send(Command::previous()).await
    }
}

/// Decode hook that logs unparsable values and forwards them to the bus.
fn invalid_field_reporter<'a>(
    bus: &'a Option<SharedBus>,
    command: &'a str,
) -> impl FnMut(&str, &str) + 'a {
    move |field, value| {
        debug!("MPD {}: ignoring unparsable {} = {:?}", command, field, value);
        if let Some(bus) = bus {
            bus.publish(MpdEvent::FieldDecodeFailed {
                command: command.to_string(),
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }
}
