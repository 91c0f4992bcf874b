//! mpd-watch
//!
//! Client for the Music Player Daemon (MPD) text protocol plus a self-healing
//! background watcher that keeps the latest player status available to any
//! number of readers.
//!
//! - [`mpd`]: connection, command transport, reply decoding, client and controller
//! - [`watcher`]: reconnecting poll loop publishing into a [`status::StatusSlot`]
//! - [`bus`]: broadcast events for watcher lifecycle and decode diagnostics
//! - [`config`]: layered settings (file, `MPDW_*` env, `MPD_HOST`/`MPD_PORT`)

pub mod bus;
pub mod config;
pub mod mpd;
pub mod status;
pub mod watcher;
