// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the wagate messaging gateway.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::ClientState;

/// Field name -> human-readable reason, as returned in 422 bodies.
pub type FieldErrors = BTreeMap<String, String>;

/// The primary error type used across all wagate adapter traits and core operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request fields missing or empty.
    #[error("validation failed for {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    /// Destination number could not be normalized into canonical form.
    #[error("invalid number: {reason}")]
    InvalidNumber { input: String, reason: String },

    /// The messaging network reports no account for the recipient.
    #[error("recipient not registered")]
    RecipientNotRegistered,

    /// A command was issued while the client was outside the `Ready` state.
    #[error("messaging client not ready (state: {state})")]
    NotReady { state: ClientState },

    /// Transport failure talking to the messaging network.
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider rejected or failed to deliver a message.
    #[error("send failed: {message}")]
    Send {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credential file read/write/delete or parse failure.
    #[error("session persistence error: {message}")]
    Session {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid TOML, missing static assets, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status code this error maps to when surfaced through the API.
    ///
    /// Caller mistakes (validation, bad number, unregistered recipient) are
    /// 422; everything else is a server-side 500.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Validation(_)
            | GatewayError::InvalidNumber { .. }
            | GatewayError::RecipientNotRegistered => 422,
            _ => 500,
        }
    }

    /// Build a single-field validation error.
    pub fn field(name: &str, reason: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), reason.into());
        GatewayError::Validation(errors)
    }

    /// Build a `Network` error from any source error.
    pub fn network<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GatewayError::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a `Session` error from any source error.
    pub fn session<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GatewayError::Session {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_422() {
        assert_eq!(GatewayError::field("number", "Invalid value").status_code(), 422);
        assert_eq!(
            GatewayError::InvalidNumber {
                input: "abc".into(),
                reason: "no digits".into()
            }
            .status_code(),
            422
        );
        assert_eq!(GatewayError::RecipientNotRegistered.status_code(), 422);
    }

    #[test]
    fn server_errors_map_to_500() {
        let not_ready = GatewayError::NotReady {
            state: ClientState::AwaitingScan,
        };
        assert_eq!(not_ready.status_code(), 500);
        assert!(not_ready.to_string().contains("awaiting-scan"));

        let send = GatewayError::Send {
            message: "timeout".into(),
            source: None,
        };
        assert_eq!(send.status_code(), 500);
        assert_eq!(send.to_string(), "send failed: timeout");
    }

    #[test]
    fn validation_display_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.insert("message".into(), "Invalid value".into());
        errors.insert("number".into(), "Invalid value".into());
        let err = GatewayError::Validation(errors);
        assert_eq!(err.to_string(), "validation failed for message, number");
    }

    #[test]
    fn session_helper_keeps_source() {
        let err = GatewayError::session("write failed", std::io::Error::other("disk full"));
        match err {
            GatewayError::Session { message, source } => {
                assert_eq!(message, "write failed");
                assert!(source.is_some());
            }
            other => panic!("expected Session, got {other:?}"),
        }
    }
}
