// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session synchronisation between the messaging client and the credential store.
//!
//! Listens to client lifecycle events and:
//! - persists credentials on `Authenticated`,
//! - clears them on `Disconnected`, then re-initializes the client without
//!   credentials so a fresh QR is produced,
//! - resets the restart counter on `Ready`.
//!
//! Outcomes are reported to observers through the [`Notifier`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wagate_core::{CredentialStore, LifecycleEvent, MessagingClient};

use crate::notifier::{status, Notifier};

/// Controls automatic re-initialization after a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Restarts allowed between two `Ready` events. `None` means unbounded.
    pub max_restarts: Option<u32>,
    /// Pause between clearing the session and re-initializing.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_restarts: None,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Reacts to lifecycle events on behalf of the client/store pair.
pub struct SessionSync {
    client: Arc<dyn MessagingClient>,
    store: Arc<dyn CredentialStore>,
    notifier: Arc<Notifier>,
    policy: ReconnectPolicy,
    restarts: u32,
}

impl SessionSync {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<Notifier>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            client,
            store,
            notifier,
            policy,
            restarts: 0,
        }
    }

    /// Restarts performed since the last `Ready`.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Handle a single lifecycle event.
    pub async fn handle(&mut self, event: &LifecycleEvent, cancel: &CancellationToken) {
        match event {
            LifecycleEvent::Authenticated { credentials } => {
                match self.store.save(credentials).await {
                    Ok(()) => {
                        self.notifier.message(status::SESSION_SAVED);
                    }
                    Err(e) => {
                        error!(error = %e, "failed to persist session");
                        self.notifier.message(e.to_string());
                    }
                }
            }
            LifecycleEvent::Ready => {
                if self.restarts > 0 {
                    debug!(restarts = self.restarts, "client ready, restart counter reset");
                }
                self.restarts = 0;
            }
            LifecycleEvent::Disconnected { reason } => {
                info!(reason = %reason, "client disconnected, clearing session");
                match self.store.clear().await {
                    Ok(()) => {
                        self.notifier.message(status::SESSION_CLEARED);
                    }
                    Err(e) => {
                        error!(error = %e, "failed to clear session");
                        self.notifier.message(e.to_string());
                    }
                }
                self.restart(cancel).await;
            }
            LifecycleEvent::AuthFailed { reason } => {
                warn!(reason = %reason, "authentication failed");
            }
            LifecycleEvent::QrAvailable { .. } => {}
        }
    }

    async fn restart(&mut self, cancel: &CancellationToken) {
        if let Some(max) = self.policy.max_restarts
            && self.restarts >= max
        {
            error!(max, "restart limit reached, manual restart required");
            self.notifier.message(status::RESTART_LIMIT);
            return;
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(self.policy.delay) => {}
        }

        self.restarts += 1;
        info!(attempt = self.restarts, "re-initializing client");
        if let Err(e) = self.client.initialize(None).await {
            error!(error = %e, "client re-initialization failed");
            self.notifier.message(e.to_string());
        }
    }

    /// Consume events from `rx` until cancelled or the stream closes.
    pub async fn run(
        mut self,
        mut rx: broadcast::Receiver<LifecycleEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = wagate_bus::next_event(&mut rx) => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.handle(&event, &cancel).await;
        }
        debug!("session sync stopped");
    }
}

/// Spawn a [`SessionSync`] consuming `rx`.
pub fn spawn_session_sync(
    sync: SessionSync,
    rx: broadcast::Receiver<LifecycleEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(sync.run(rx, cancel))
}
