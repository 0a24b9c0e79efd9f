// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential store with failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use wagate_core::{
    AdapterType, CredentialBlob, CredentialStore, GatewayError, HealthStatus, PluginAdapter,
};

/// A credential store that keeps the blob in memory and counts calls.
#[derive(Default)]
pub struct MockCredentialStore {
    blob: Mutex<Option<CredentialBlob>>,
    fail_load: AtomicBool,
    fail_save: AtomicBool,
    fail_clear: AtomicBool,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `blob`.
    pub fn with_blob(blob: CredentialBlob) -> Self {
        let store = Self::new();
        *store.slot() = Some(blob);
        store
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CredentialBlob>> {
        self.blob.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Option<CredentialBlob> {
        self.slot().clone()
    }

    pub fn fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    fn injected(what: &str) -> GatewayError {
        GatewayError::Session {
            message: format!("injected {what} failure"),
            source: None,
        }
    }
}

#[async_trait]
impl PluginAdapter for MockCredentialStore {
    fn name(&self) -> &str {
        "mock-store"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SessionStore
    }

    async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load(&self) -> Result<Option<CredentialBlob>, GatewayError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(Self::injected("load"));
        }
        Ok(self.current())
    }

    async fn save(&self, blob: &CredentialBlob) -> Result<(), GatewayError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Self::injected("save"));
        }
        *self.slot() = Some(blob.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), GatewayError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(Self::injected("clear"));
        }
        *self.slot() = None;
        Ok(())
    }
}
