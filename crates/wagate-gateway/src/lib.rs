// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API, realtime notifier, and lifecycle wiring for the gateway.
//!
//! [`GatewayContext`] ties a [`MessagingClient`] and a [`CredentialStore`]
//! together: it builds the axum router, relays client lifecycle events to
//! WebSocket observers, and keeps the stored session in step with the
//! client.

pub mod handlers;
pub mod lifecycle;
pub mod notifier;
pub mod qr;
pub mod server;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use wagate_core::{CredentialBlob, CredentialStore, GatewayError, MessagingClient, PhoneFormatter};

pub use crate::lifecycle::{ReconnectPolicy, SessionSync};
pub use crate::notifier::{Notifier, NotifierFrame};
pub use crate::server::{GatewayState, HealthState, ServerConfig};

/// Everything the running gateway shares between its tasks.
#[derive(Clone)]
pub struct GatewayContext {
    pub client: Arc<dyn MessagingClient>,
    pub store: Arc<dyn CredentialStore>,
    pub notifier: Arc<Notifier>,
    pub formatter: Arc<PhoneFormatter>,
    pub policy: ReconnectPolicy,
    health: HealthState,
}

impl GatewayContext {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        store: Arc<dyn CredentialStore>,
        formatter: PhoneFormatter,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            client,
            store,
            notifier: Arc::new(Notifier::new()),
            formatter: Arc::new(formatter),
            policy,
            health: HealthState {
                start_time: std::time::Instant::now(),
            },
        }
    }

    /// Handler state for the axum router.
    pub fn state(&self) -> GatewayState {
        GatewayState {
            client: Arc::clone(&self.client),
            formatter: Arc::clone(&self.formatter),
            notifier: Arc::clone(&self.notifier),
            health: self.health.clone(),
        }
    }

    /// Build the full router; fails if the pairing page is missing.
    pub fn router(&self, config: &ServerConfig, extra: Router) -> Result<Router, GatewayError> {
        server::build_router(config, self.state(), extra)
    }

    /// Start the notifier relay and session sync tasks.
    ///
    /// Both subscribe to the client before this returns, so events emitted
    /// by a subsequent [`start_client`](Self::start_client) are not missed.
    pub fn spawn_background(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let relay = notifier::spawn_relay(
            Arc::clone(&self.notifier),
            self.client.subscribe(),
            cancel.child_token(),
        );

        let sync = SessionSync::new(
            Arc::clone(&self.client),
            Arc::clone(&self.store),
            Arc::clone(&self.notifier),
            self.policy,
        );
        let sync = lifecycle::spawn_session_sync(sync, self.client.subscribe(), cancel.child_token());

        vec![relay, sync]
    }

    /// Read the stored session, if any.
    ///
    /// An unreadable or malformed file is an error, never "no session".
    pub async fn load_session(&self) -> Result<Option<CredentialBlob>, GatewayError> {
        match self.store.load().await {
            Ok(prior) => Ok(prior),
            Err(e) => {
                error!(error = %e, "stored session unusable");
                self.notifier.message(e.to_string());
                Err(e)
            }
        }
    }

    /// Initialize the client, optionally resuming `prior`.
    ///
    /// Failures are reported to observers and returned.
    pub async fn initialize_client(&self, prior: Option<CredentialBlob>) -> Result<(), GatewayError> {
        info!(resumed = prior.is_some(), "initializing messaging client");
        if let Err(e) = self.client.initialize(prior).await {
            error!(error = %e, "messaging client initialization failed");
            self.notifier.message(e.to_string());
            return Err(e);
        }
        Ok(())
    }

    /// Load the stored session and initialize the client with it.
    pub async fn start_client(&self) -> Result<(), GatewayError> {
        let prior = self.load_session().await?;
        self.initialize_client(prior).await
    }
}
