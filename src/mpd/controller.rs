//! Ad hoc command handle for collaborators (remote controls, CLIs).
//!
//! Owns one connection that is separate from the watcher's. The connection is
//! opened on first use and reused afterwards; once it has failed at the
//! transport level the next call opens a fresh one. Errors are always
//! returned to the caller, never retried here.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::client::MpdClient;
use super::connection::ConnectOptions;
use super::error::{CommandError, MpdError};
use super::response::Status;
use crate::bus::SharedBus;
use crate::status::StatusSlot;

pub struct MpdController {
    addr: String,
    options: ConnectOptions,
    slot: StatusSlot,
    bus: Option<SharedBus>,
    client: Mutex<Option<MpdClient>>,
}

impl MpdController {
    /// `slot` is the watcher's shared status, consulted by `toggle_pause`.
    pub fn new(addr: impl Into<String>, slot: StatusSlot) -> Self {
        Self {
            addr: addr.into(),
            options: ConnectOptions::default(),
            slot,
            bus: None,
            client: Mutex::new(None),
        }
    }

    pub fn with_options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_events(mut self, bus: SharedBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Last status published by the watcher.
    pub fn shared_status(&self) -> Option<Arc<Status>> {
        self.slot.read()
    }

    /// Return the cached client, connecting first if there is none or it has failed.
    async fn connected<'a>(
        &self,
        cached: &'a mut Option<MpdClient>,
    ) -> Result<&'a mut MpdClient, MpdError> {
        if !cached.as_ref().is_some_and(|client| client.is_open()) {
            if cached.is_some() {
                info!("MPD controller: reconnecting to {}", self.addr);
            }
            let client = MpdClient::connect_with(&self.addr, self.options).await?;
            let client = match &self.bus {
                Some(bus) => client.with_events(bus.clone()),
                None => client,
            };
            return Ok(cached.insert(client));
        }
        cached.as_mut().ok_or(MpdError::Command(CommandError::Closed))
    }

    /// Fresh status straight from the server. Does not touch the shared slot.
    pub async fn status(&self) -> Result<Status, MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.status().await?)
    }

    pub async fn list(&self, tag: &str, filters: &[(&str, &str)]) -> Result<Vec<String>, MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.list(tag, filters).await?)
    }

    pub async fn play(&self, position: Option<u32>) -> Result<(), MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.play(position).await?)
    }

    pub async fn play_id(&self, id: Option<u32>) -> Result<(), MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.play_id(id).await?)
    }

    pub async fn pause(&self, paused: bool) -> Result<(), MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.pause(paused).await?)
    }

    /// Pause when the shared status says `play`, resume otherwise.
    ///
    /// Returns true when a pause was requested.
    pub async fn toggle_pause(&self) -> Result<bool, MpdError> {
        let playing = self.slot.read().is_some_and(|status| status.is_playing());
        self.pause(playing).await?;
        Ok(playing)
    }

    pub async fn random(&self, enabled: bool) -> Result<(), MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.random(enabled).await?)
    }

    pub async fn repeat(&self, enabled: bool) -> Result<(), MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.repeat(enabled).await?)
    }

    pub async fn single(&self, enabled: bool) -> Result<(), MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.single(enabled).await?)
    }

    pub async fn next(&self) -> Result<(), MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.next().await?)
    }

    pub async fn previous(&self) -> Result<(), MpdError> {
        let mut guard = self.client.lock().await;
        Ok(self.connected(&mut guard).await?.previous().await?)
    }

    /// Close the cached connection, if any.
    pub async fn close(&self) {
        let client = self.client.lock().await.take();
        if let Some(mut client) = client {
            client.close().await;
        }
    }
}
