//! Event bus for watcher lifecycle and decode diagnostics
//!
//! Uses tokio::sync::broadcast for pub/sub pattern.
//! Publishing never blocks and never fails; events are dropped when nobody listens.

mod events;

pub use events::MpdEvent;

use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast of watcher lifecycle (`StateChanged`, `Connected`,
/// `Disconnected`), each published `StatusUpdated` generation, and
/// diagnostics for fields or metadata that failed to decode.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MpdEvent>,
}

impl EventBus {
    /// Slow subscribers see `Lagged` once `capacity` events are outstanding
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: MpdEvent) {
        // Err only means nobody is subscribed
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> broadcast::Receiver<MpdEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    /// Default capacity (256 events)
    fn default() -> Self {
        Self::new(256)
    }
}

/// Shared event bus wrapped in Arc for thread-safe sharing
pub type SharedBus = Arc<EventBus>;

/// Create a new shared event bus
pub fn create_bus() -> SharedBus {
    Arc::new(EventBus::default())
}
