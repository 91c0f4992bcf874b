//! Shared status slot
//!
//! Holds the most recent successfully decoded `Status`. The watcher is the
//! only writer; any number of readers may clone the handle. The lock is held
//! only to swap or clone an `Arc`, never across I/O. The slot is never
//! cleared: during an outage readers keep seeing the last good value.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::mpd::Status;

/// A published status together with when and in which order it was published.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub status: Arc<Status>,
    /// Starts at 1 and increases by one per publish.
    pub generation: u64,
    pub published_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Time since this snapshot was published.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.published_at
    }
}

/// Cloneable handle to the shared status.
#[derive(Debug, Clone, Default)]
pub struct StatusSlot {
    inner: Arc<RwLock<Option<StatusSnapshot>>>,
}

impl StatusSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held status. Returns the new generation.
    pub fn publish(&self, status: Status) -> u64 {
        let status = Arc::new(status);
        let published_at = Utc::now();

        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let generation = slot.as_ref().map_or(1, |current| current.generation + 1);
        *slot = Some(StatusSnapshot {
            status,
            generation,
            published_at,
        });
        generation
    }

    /// Most recently published status, or `None` before the first publish.
    pub fn read(&self) -> Option<Arc<Status>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|snapshot| snapshot.status.clone())
    }

    pub fn snapshot(&self) -> Option<StatusSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Generation of the held status; 0 when empty.
    pub fn generation(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |snapshot| snapshot.generation)
    }
}
