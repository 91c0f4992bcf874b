//! MPD error types.

use thiserror::Error;

/// Errors raised while establishing a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("could not connect to MPD at {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected MPD greeting from {addr}: {line:?}")]
    Greeting { addr: String, line: String },

    #[error("MPD at {addr} closed the connection before greeting")]
    Closed { addr: String },

    #[error("timed out connecting to MPD at {addr}")]
    Timeout { addr: String },
}

/// Errors raised by a single command round trip.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Server rejected the command. Carries the text after `ACK `.
    #[error("MPD rejected command: {0}")]
    Ack(String),

    #[error("MPD I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MPD connection closed")]
    Closed,

    #[error("MPD command timed out")]
    Timeout,
}

impl CommandError {
    /// True when the connection can no longer be trusted for another command.
    ///
    /// An `ACK` leaves the stream positioned at the next reply, every other
    /// variant does not.
    pub fn is_connection_lost(&self) -> bool {
        !matches!(self, CommandError::Ack(_))
    }

    /// Server-supplied detail for `ACK` failures.
    pub fn ack_detail(&self) -> Option<&str> {
        match self {
            CommandError::Ack(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Client-level error: either side of the connection lifecycle.
#[derive(Debug, Error)]
pub enum MpdError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl MpdError {
    pub fn is_connection_lost(&self) -> bool {
        match self {
            MpdError::Connect(_) => true,
            MpdError::Command(e) => e.is_connection_lost(),
        }
    }
}
