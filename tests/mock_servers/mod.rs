//! Mock servers for integration testing
//!
//! Simulate an MPD daemon so the client, controller and watcher can be
//! exercised over real TCP without a running server.

pub mod mpd;

pub use mpd::{MockMpdServer, MockMpdState};
