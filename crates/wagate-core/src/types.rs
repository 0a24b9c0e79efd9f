// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the client facade, session store, and HTTP API.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque authentication state issued by the messaging network.
///
/// The gateway never inspects the contents; it only persists and replays them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialBlob(pub serde_json::Value);

/// Provider acknowledgement for a submitted message, echoed verbatim to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageReceipt(pub serde_json::Value);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Messaging,
    SessionStore,
}

/// Lifecycle notifications emitted by the messaging client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum LifecycleEvent {
    /// A pairing QR code is available (raw QR payload, not yet rendered).
    QrAvailable { qr: String },
    /// The session authenticated; carries the credentials to persist.
    Authenticated { credentials: CredentialBlob },
    /// The client is connected and accepts commands.
    Ready,
    /// Authentication was rejected for this attempt.
    AuthFailed { reason: String },
    /// The connection dropped or the session was logged out.
    Disconnected { reason: String },
}

impl LifecycleEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::QrAvailable { .. } => "qr-available",
            LifecycleEvent::Authenticated { .. } => "authenticated",
            LifecycleEvent::Ready => "ready",
            LifecycleEvent::AuthFailed { .. } => "auth-failed",
            LifecycleEvent::Disconnected { .. } => "disconnected",
        }
    }
}

/// Connection state of the messaging client.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ClientState {
    #[default]
    Uninitialized,
    AwaitingScan,
    Authenticated,
    Ready,
    AuthFailed,
}

impl ClientState {
    /// Apply a lifecycle event and return the resulting state.
    ///
    /// `Disconnected` always returns to `Uninitialized`. `AuthFailed` is
    /// terminal for the attempt: only a disconnect or the QR of a fresh
    /// attempt moves it again. Events that make no sense in the current
    /// state leave it unchanged.
    pub fn on_event(self, event: &LifecycleEvent) -> ClientState {
        use ClientState::*;

        match (self, event) {
            (_, LifecycleEvent::Disconnected { .. }) => Uninitialized,
            (Uninitialized | AwaitingScan | AuthFailed, LifecycleEvent::QrAvailable { .. }) => {
                AwaitingScan
            }
            // Resuming from stored credentials skips the QR step.
            (Uninitialized | AwaitingScan, LifecycleEvent::Authenticated { .. }) => Authenticated,
            (Uninitialized | AwaitingScan | Authenticated, LifecycleEvent::Ready) => Ready,
            (Uninitialized | AwaitingScan, LifecycleEvent::AuthFailed { .. }) => AuthFailed,
            (state, _) => state,
        }
    }

    /// Whether registration checks and sends are permitted.
    pub fn accepts_commands(self) -> bool {
        self == ClientState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qr() -> LifecycleEvent {
        LifecycleEvent::QrAvailable { qr: "2@abc".into() }
    }

    fn authenticated() -> LifecycleEvent {
        LifecycleEvent::Authenticated {
            credentials: CredentialBlob(serde_json::json!({"token": "t"})),
        }
    }

    fn disconnected() -> LifecycleEvent {
        LifecycleEvent::Disconnected {
            reason: "NAVIGATION".into(),
        }
    }

    #[test]
    fn pairing_flow_reaches_ready() {
        let state = ClientState::Uninitialized
            .on_event(&qr())
            .on_event(&qr())
            .on_event(&authenticated())
            .on_event(&LifecycleEvent::Ready);
        assert_eq!(state, ClientState::Ready);
        assert!(state.accepts_commands());
    }

    #[test]
    fn resume_skips_qr() {
        let state = ClientState::Uninitialized.on_event(&authenticated());
        assert_eq!(state, ClientState::Authenticated);
        assert!(!state.accepts_commands());
    }

    #[test]
    fn disconnect_resets_from_any_state() {
        for state in [
            ClientState::Uninitialized,
            ClientState::AwaitingScan,
            ClientState::Authenticated,
            ClientState::Ready,
            ClientState::AuthFailed,
        ] {
            assert_eq!(state.on_event(&disconnected()), ClientState::Uninitialized);
        }
    }

    #[test]
    fn auth_failure_is_terminal_for_attempt() {
        let failed = ClientState::AwaitingScan.on_event(&LifecycleEvent::AuthFailed {
            reason: "bad".into(),
        });
        assert_eq!(failed, ClientState::AuthFailed);
        assert_eq!(failed.on_event(&authenticated()), ClientState::AuthFailed);
        assert_eq!(failed.on_event(&LifecycleEvent::Ready), ClientState::AuthFailed);
        // A fresh attempt starts with a new QR.
        assert_eq!(failed.on_event(&qr()), ClientState::AwaitingScan);
    }

    #[test]
    fn ready_ignores_stray_qr() {
        assert_eq!(ClientState::Ready.on_event(&qr()), ClientState::Ready);
    }

    #[test]
    fn only_ready_accepts_commands() {
        assert!(!ClientState::Uninitialized.accepts_commands());
        assert!(!ClientState::AwaitingScan.accepts_commands());
        assert!(!ClientState::Authenticated.accepts_commands());
        assert!(!ClientState::AuthFailed.accepts_commands());
    }

    #[test]
    fn client_state_display_is_kebab_case() {
        assert_eq!(ClientState::AwaitingScan.to_string(), "awaiting-scan");
        assert_eq!(ClientState::AuthFailed.to_string(), "auth-failed");
        let json = serde_json::to_string(&ClientState::Ready).unwrap();
        assert_eq!(json, "\"ready\"");
    }

    #[test]
    fn lifecycle_event_serializes_tagged() {
        let json = serde_json::to_value(qr()).unwrap();
        assert_eq!(json["event"], "qr-available");
        assert_eq!(json["qr"], "2@abc");
        assert_eq!(LifecycleEvent::Ready.name(), "ready");
    }

    #[test]
    fn credential_blob_is_transparent() {
        let blob = CredentialBlob(serde_json::json!({"WABrowserId": "x"}));
        let json = serde_json::to_string(&blob).unwrap();
        assert_eq!(json, r#"{"WABrowserId":"x"}"#);
    }
}
