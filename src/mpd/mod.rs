//! MPD protocol client
//!
//! Line-oriented TCP protocol: the server greets with `OK MPD <version>`, then
//! every command is answered by zero or more `key: value` lines terminated by
//! `OK` or an `ACK ...` error line.

mod client;
mod connection;
mod controller;
mod error;
mod protocol;
mod response;
#[cfg(test)]
mod testing;

pub use client::MpdClient;
pub use connection::{ConnectOptions, Connection};
pub use controller::MpdController;
pub use error::{CommandError, ConnectError, MpdError};
pub use protocol::{parse_greeting, Command, ReplyLine};
pub use response::{
    decode_list, decode_song, decode_song_with, decode_status, decode_status_with, parse_record,
    Record, Song, Status,
};

/// Default MPD TCP port.
pub const DEFAULT_PORT: u16 = 6600;

/// Join host and port into a connect address, bracketing bare IPv6 hosts.
pub fn address(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
