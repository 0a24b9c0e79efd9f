// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store trait for session persistence backends.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::CredentialBlob;

/// Persists at most one credential blob per process.
#[async_trait]
pub trait CredentialStore: PluginAdapter {
    /// Loads the stored blob. Absence is `Ok(None)`; unreadable or malformed
    /// content is an error, never "absent".
    async fn load(&self) -> Result<Option<CredentialBlob>, GatewayError>;

    /// Stores `blob`, replacing any previous one.
    async fn save(&self, blob: &CredentialBlob) -> Result<(), GatewayError>;

    /// Removes the stored blob. Removing nothing is not an error.
    async fn clear(&self) -> Result<(), GatewayError>;
}
