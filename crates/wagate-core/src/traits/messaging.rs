// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging client facade: the single integration point with the messaging network.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::GatewayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ClientState, CredentialBlob, LifecycleEvent, MessageReceipt};

/// A long-lived connection to the messaging network.
///
/// Lifecycle progress is reported through [`LifecycleEvent`]s on the stream
/// returned by [`subscribe`](MessagingClient::subscribe), never through the
/// return value of [`initialize`](MessagingClient::initialize).
#[async_trait]
pub trait MessagingClient: PluginAdapter {
    /// Starts (or restarts) the session, optionally resuming from stored credentials.
    ///
    /// Returns once the start request has been accepted.
    async fn initialize(&self, prior: Option<CredentialBlob>) -> Result<(), GatewayError>;

    /// Current connection state.
    fn state(&self) -> ClientState;

    /// Subscribes to lifecycle events. Events published before the call are not replayed.
    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent>;

    /// Whether `number` (canonical form) has an account on the network.
    ///
    /// Fails with [`GatewayError::NotReady`] outside the `Ready` state.
    async fn is_registered(&self, number: &str) -> Result<bool, GatewayError>;

    /// Sends a text message to `number` (canonical form).
    ///
    /// Callers are expected to check registration first.
    async fn send(&self, number: &str, body: &str) -> Result<MessageReceipt, GatewayError>;
}
