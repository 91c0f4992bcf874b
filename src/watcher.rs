//! Status watcher - keeps the shared status slot fresh
//!
//! One long-lived task owns a private MPD connection and cycles through
//! `Disconnected -> Connecting -> Polling`. While polling it fetches the status
//! once per tick and publishes it into the `StatusSlot`. Any transport or
//! protocol failure closes the connection and falls back to `Disconnected`;
//! the slot keeps its last value during the outage.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::{MpdEvent, SharedBus};
use crate::mpd::{CommandError, ConnectOptions, MpdClient};
use crate::status::StatusSlot;

/// Connection lifecycle of the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    Disconnected,
    Connecting,
    Polling,
}

/// Reconnect delay policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Backoff caps at this value
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl RetryConfig {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
        }
    }

    /// Same delay before every retry.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    pub retry: RetryConfig,
    pub connect: ConnectOptions,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            retry: RetryConfig::default(),
            connect: ConnectOptions::default(),
        }
    }
}

/// Why a polling session ended.
enum SessionEnd {
    Cancelled,
    Failed(CommandError),
}

pub struct StatusWatcher {
    addr: String,
    config: WatcherConfig,
    slot: StatusSlot,
    bus: SharedBus,
    state: watch::Sender<WatcherState>,
}

impl StatusWatcher {
    pub fn new(
        addr: impl Into<String>,
        config: WatcherConfig,
        slot: StatusSlot,
        bus: SharedBus,
    ) -> Self {
        let (state, _) = watch::channel(WatcherState::Disconnected);
        Self {
            addr: addr.into(),
            config,
            slot,
            bus,
            state,
        }
    }

    pub fn slot(&self) -> &StatusSlot {
        &self.slot
    }

    /// Follow state transitions. Take this before `spawn`.
    pub fn state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    /// Run on a new task until `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Drive the state machine until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let retry = self.config.retry.clone();
        let mut delay = retry.initial_delay;
        let mut first_attempt = true;

        info!(
            "MPD watcher for {} starting (poll every {:?})",
            self.addr, self.config.poll_interval
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if !first_attempt {
                self.transition(WatcherState::Disconnected);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        delay = retry.next_delay(delay);
                    }
                }
            }
            first_attempt = false;

            self.transition(WatcherState::Connecting);
            let connected = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = MpdClient::connect_with(&self.addr, self.config.connect) => result,
            };
            let mut client = match connected {
                Ok(client) => client.with_events(self.bus.clone()),
                Err(e) => {
                    warn!("MPD watcher: {}. Retrying in {:?}", e, delay);
                    continue;
                }
            };

            self.bus.publish(MpdEvent::Connected {
                addr: self.addr.clone(),
                server_version: client.server_version().to_string(),
            });
            self.transition(WatcherState::Polling);

            let (end, polls) = self.poll(&mut client, &shutdown).await;
            client.close().await;

            if polls > 0 {
                delay = retry.initial_delay;
            }

            match end {
                SessionEnd::Cancelled => break,
                SessionEnd::Failed(e) => {
                    warn!(
                        "MPD watcher: lost {} after {} polls: {}. Retrying in {:?}",
                        self.addr, polls, e, delay
                    );
                    self.bus.publish(MpdEvent::Disconnected {
                        addr: self.addr.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.transition(WatcherState::Disconnected);
        info!("MPD watcher for {} stopped", self.addr);
    }

    /// Poll once right away and then on every tick until failure or shutdown.
    ///
    /// Returns how the session ended and how many polls succeeded.
    async fn poll(&self, client: &mut MpdClient, shutdown: &CancellationToken) -> (SessionEnd, u64) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return (SessionEnd::Cancelled, polls),
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = shutdown.cancelled() => return (SessionEnd::Cancelled, polls),
                result = client.status() => result,
            };

            match result {
                Ok(status) => {
                    let state = status.state.clone();
                    let generation = self.slot.publish(status);
                    polls += 1;
                    debug!("MPD watcher: published generation {} ({})", generation, state);
                    self.bus.publish(MpdEvent::StatusUpdated {
                        addr: self.addr.clone(),
                        generation,
                        state,
                    });
                }
                Err(e) => return (SessionEnd::Failed(e), polls),
            }
        }
    }

    fn transition(&self, state: WatcherState) {
        let previous = self.state.send_replace(state);
        if previous == state {
            return;
        }
        debug!("MPD watcher {}: {:?} -> {:?}", self.addr, previous, state);
        self.bus.publish(MpdEvent::StateChanged {
            addr: self.addr.clone(),
            state,
        });
    }
}
