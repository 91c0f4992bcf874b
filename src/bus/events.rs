use serde::{Deserialize, Serialize};

use crate::watcher::WatcherState;

/// Event types that can be published on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum MpdEvent {
    // Watcher lifecycle
    StateChanged {
        addr: String,
        state: WatcherState,
    },
    Connected {
        addr: String,
        server_version: String,
    },
    Disconnected {
        addr: String,
        reason: String,
    },
    /// A new status was published into the shared slot
    StatusUpdated {
        addr: String,
        generation: u64,
        state: String,
    },

    // Diagnostics
    /// A reply value could not be parsed; the field kept its default
    FieldDecodeFailed {
        command: String,
        field: String,
        value: String,
    },
    /// `currentsong` failed; the status was published without metadata
    MetadataFetchFailed {
        addr: String,
        reason: String,
    },
}
