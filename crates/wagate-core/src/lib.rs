// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the wagate messaging gateway.
//!
//! This crate provides the adapter traits, the error taxonomy, the client
//! state machine, and destination number normalization used throughout the
//! wagate workspace.

pub mod error;
pub mod phone;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{FieldErrors, GatewayError};
pub use phone::PhoneFormatter;
pub use types::{
    AdapterType, ClientState, CredentialBlob, HealthStatus, LifecycleEvent, MessageReceipt,
};

pub use traits::{CredentialStore, MessagingClient, PluginAdapter};
