// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file implementation of the CredentialStore trait.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use wagate_core::{
    AdapterType, CredentialBlob, CredentialStore, GatewayError, HealthStatus, PluginAdapter,
};

/// File-backed credential store.
///
/// Writes go to a sibling `.tmp` file that is then renamed over the target,
/// so a crash mid-write never leaves a truncated credential file behind.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store for the credential file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PluginAdapter for FileSessionStore {
    fn name(&self) -> &str {
        "file-session"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SessionStore
    }

    async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                dir.display()
            ))),
            // save() creates the directory on demand.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HealthStatus::Degraded(format!(
                "{} does not exist yet",
                dir.display()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileSessionStore {
    async fn load(&self) -> Result<Option<CredentialBlob>, GatewayError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored session");
                return Ok(None);
            }
            Err(e) => {
                return Err(GatewayError::session(
                    format!("failed to read {}", self.path.display()),
                    e,
                ));
            }
        };

        let blob: CredentialBlob = serde_json::from_slice(&bytes).map_err(|e| {
            GatewayError::session(format!("malformed session file {}", self.path.display()), e)
        })?;

        info!(path = %self.path.display(), "loaded stored session");
        Ok(Some(blob))
    }

    async fn save(&self, blob: &CredentialBlob) -> Result<(), GatewayError> {
        let json = serde_json::to_vec(blob)
            .map_err(|e| GatewayError::session("failed to serialize session", e))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GatewayError::session(format!("failed to create {}", parent.display()), e)
            })?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &json).await.map_err(|e| {
            GatewayError::session(format!("failed to write {}", tmp.display()), e)
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            GatewayError::session(format!("failed to replace {}", self.path.display()), e)
        })?;

        info!(path = %self.path.display(), "session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), GatewayError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "session removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GatewayError::session(
                format!("failed to remove {}", self.path.display()),
                e,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> CredentialBlob {
        CredentialBlob(serde_json::json!({
            "WABrowserId": "\"abc==\"",
            "WASecretBundle": {"key": "k", "encKey": "e", "macKey": "m"},
            "WAToken1": "\"t1\"",
            "WAToken2": "\"1@t2\""
        }))
    }

    #[tokio::test]
    async fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sesi.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sesi.json"));

        store.save(&blob()).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, Some(blob()));
        assert!(!store.tmp_path().exists(), "temp file should be renamed away");
    }

    #[tokio::test]
    async fn save_overwrites_previous_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sesi.json"));

        store.save(&blob()).await.unwrap();
        let newer = CredentialBlob(serde_json::json!({"WAToken1": "new"}));
        store.save(&newer).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/state/sesi.json"));
        store.save(&blob()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn malformed_file_is_an_error_not_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sesi.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileSessionStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, GatewayError::Session { .. }));
        assert!(err.to_string().contains("malformed"));
    }

    #[tokio::test]
    async fn clear_removes_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sesi.json"));

        store.save(&blob()).await.unwrap();
        store.clear().await.unwrap();
        assert!(!store.path().exists());

        // Second clear has nothing to remove.
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_into_unwritable_location_reports_session_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let store = FileSessionStore::new(blocker.join("sesi.json"));

        let err = store.save(&blob()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Session { .. }));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn credentials_are_never_logged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sesi.json"));

        store.save(&blob()).await.unwrap();
        store.load().await.unwrap();

        assert!(logs_contain("session saved"));
        assert!(logs_contain("loaded stored session"));
        assert!(!logs_contain("WASecretBundle"));
    }

    #[tokio::test]
    async fn health_check_reports_directory_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sesi.json"));
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);

        let missing = FileSessionStore::new(dir.path().join("later/sesi.json"));
        assert!(matches!(
            missing.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
