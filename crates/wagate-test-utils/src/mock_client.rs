// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging client for deterministic testing.
//!
//! `MockMessagingClient` implements `MessagingClient` without any network.
//! Lifecycle events are injected with [`MockMessagingClient::emit`]; every
//! command is recorded for assertions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use wagate_bus::EventBus;
use wagate_core::{
    AdapterType, ClientState, CredentialBlob, GatewayError, HealthStatus, LifecycleEvent,
    MessageReceipt, MessagingClient, PluginAdapter,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A scripted messaging client.
pub struct MockMessagingClient {
    state: Mutex<ClientState>,
    bus: EventBus<LifecycleEvent>,
    registered: AtomicBool,
    lookup_error: Mutex<Option<String>>,
    send_error: Mutex<Option<String>>,
    init_error: Mutex<Option<String>>,
    initialized_with: Mutex<Vec<Option<CredentialBlob>>>,
    lookups: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockMessagingClient {
    /// A fresh client in `Uninitialized` state; every number is registered.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClientState::Uninitialized),
            bus: EventBus::default(),
            registered: AtomicBool::new(true),
            lookup_error: Mutex::new(None),
            send_error: Mutex::new(None),
            init_error: Mutex::new(None),
            initialized_with: Mutex::new(Vec::new()),
            lookups: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A client that is already `Ready`.
    pub fn ready() -> Self {
        let client = Self::new();
        client.set_state(ClientState::Ready);
        client
    }

    pub fn set_state(&self, state: ClientState) {
        *lock(&self.state) = state;
    }

    pub fn set_registered(&self, registered: bool) {
        self.registered.store(registered, Ordering::SeqCst);
    }

    /// Make `is_registered` fail with a network error.
    pub fn fail_lookups(&self, message: &str) {
        *lock(&self.lookup_error) = Some(message.to_string());
    }

    /// Make `send` fail with a send error.
    pub fn fail_sends(&self, message: &str) {
        *lock(&self.send_error) = Some(message.to_string());
    }

    /// Make `initialize` fail with a network error.
    pub fn fail_initialize(&self, message: &str) {
        *lock(&self.init_error) = Some(message.to_string());
    }

    /// Apply `event` to the state machine and publish it to subscribers.
    pub fn emit(&self, event: LifecycleEvent) -> usize {
        {
            let mut state = lock(&self.state);
            *state = state.on_event(&event);
        }
        self.bus.publish(event)
    }

    /// Credentials passed to each `initialize` call, in order.
    pub fn initialize_calls(&self) -> Vec<Option<CredentialBlob>> {
        lock(&self.initialized_with).clone()
    }

    /// Numbers passed to `is_registered`, in order.
    pub fn lookups(&self) -> Vec<String> {
        lock(&self.lookups).clone()
    }

    /// `(number, body)` pairs passed to `send`, in order.
    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }

    fn ensure_ready(&self) -> Result<(), GatewayError> {
        let state = *lock(&self.state);
        if state.accepts_commands() {
            Ok(())
        } else {
            Err(GatewayError::NotReady { state })
        }
    }
}

impl Default for MockMessagingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockMessagingClient {
    fn name(&self) -> &str {
        "mock-client"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingClient for MockMessagingClient {
    async fn initialize(&self, prior: Option<CredentialBlob>) -> Result<(), GatewayError> {
        lock(&self.initialized_with).push(prior);
        if let Some(message) = lock(&self.init_error).clone() {
            return Err(GatewayError::Network {
                message,
                source: None,
            });
        }
        Ok(())
    }

    fn state(&self) -> ClientState {
        *lock(&self.state)
    }

    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.bus.subscribe()
    }

    async fn is_registered(&self, number: &str) -> Result<bool, GatewayError> {
        self.ensure_ready()?;
        lock(&self.lookups).push(number.to_string());
        if let Some(message) = lock(&self.lookup_error).clone() {
            return Err(GatewayError::Network {
                message,
                source: None,
            });
        }
        Ok(self.registered.load(Ordering::SeqCst))
    }

    async fn send(&self, number: &str, body: &str) -> Result<MessageReceipt, GatewayError> {
        self.ensure_ready()?;
        let seq = {
            let mut sent = lock(&self.sent);
            sent.push((number.to_string(), body.to_string()));
            sent.len()
        };
        if let Some(message) = lock(&self.send_error).clone() {
            return Err(GatewayError::Send {
                message,
                source: None,
            });
        }
        Ok(MessageReceipt(serde_json::json!({
            "id": {"_serialized": format!("true_{number}_MOCK{seq}"), "fromMe": true},
            "to": number,
            "body": body,
            "ack": 0
        })))
    }
}
