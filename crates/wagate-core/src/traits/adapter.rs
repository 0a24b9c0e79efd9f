// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all wagate adapters implement.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for wagate adapters.
///
/// Provides identity, health reporting, and shutdown for the messaging
/// client and the session store.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the type of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, GatewayError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), GatewayError>;
}
