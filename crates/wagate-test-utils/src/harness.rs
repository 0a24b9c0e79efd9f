// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete gateway with mock adapters and a
//! temporary static directory. Requests are driven through the real axum
//! router in-process via `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use wagate_core::{ClientState, GatewayError, PhoneFormatter};
use wagate_gateway::{GatewayContext, ReconnectPolicy, ServerConfig};

use crate::mock_client::MockMessagingClient;
use crate::mock_store::MockCredentialStore;

/// Pairing page written into the harness static directory.
pub const INDEX_HTML: &str = "<!doctype html><title>wagate test</title>";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    client_state: ClientState,
    store: MockCredentialStore,
    policy: ReconnectPolicy,
    background: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            client_state: ClientState::Ready,
            store: MockCredentialStore::new(),
            policy: ReconnectPolicy {
                max_restarts: None,
                delay: Duration::from_millis(10),
            },
            background: false,
        }
    }

    /// Initial state of the mock client (default `Ready`).
    pub fn with_client_state(mut self, state: ClientState) -> Self {
        self.client_state = state;
        self
    }

    /// Use a pre-configured credential store.
    pub fn with_store(mut self, store: MockCredentialStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Start the notifier relay and session sync tasks.
    pub fn with_background(mut self) -> Self {
        self.background = true;
        self
    }

    /// Build the harness.
    pub fn build(self) -> Result<TestHarness, GatewayError> {
        let static_dir = tempfile::TempDir::new()
            .map_err(|e| GatewayError::Internal(format!("temp dir: {e}")))?;
        std::fs::write(static_dir.path().join("index.html"), INDEX_HTML)
            .map_err(|e| GatewayError::Internal(format!("index.html: {e}")))?;

        let client = Arc::new(MockMessagingClient::new());
        client.set_state(self.client_state);
        let store = Arc::new(self.store);

        let context = GatewayContext::new(
            client.clone(),
            store.clone(),
            PhoneFormatter::default(),
            self.policy,
        );

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            static_dir: static_dir.path().to_path_buf(),
        };
        let router = context.router(&config, Router::new())?;

        let cancel = CancellationToken::new();
        let tasks = if self.background {
            context.spawn_background(&cancel)
        } else {
            Vec::new()
        };

        Ok(TestHarness {
            client,
            store,
            context,
            router,
            cancel,
            tasks,
            _static_dir: static_dir,
        })
    }
}

/// A complete gateway with mock adapters.
pub struct TestHarness {
    pub client: Arc<MockMessagingClient>,
    pub store: Arc<MockCredentialStore>,
    pub context: GatewayContext,
    pub router: Router,
    pub cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    /// Kept alive so the static directory outlives the router.
    _static_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send a request through the router and return status and raw body.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| match e {});
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map(|b| b.to_vec())
            .unwrap_or_default();
        (status, body)
    }

    /// POST `body` with the given content type; the response body is parsed as JSON.
    pub async fn post_raw(
        &self,
        path: &str,
        content_type: &str,
        body: impl Into<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap_or_default();
        let (status, bytes) = self.request(request).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.post_raw(path, "application/json", body.to_string()).await
    }

    pub async fn post_form(&self, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
        self.post_raw(path, "application/x-www-form-urlencoded", body.to_string())
            .await
    }

    /// GET `path`, returning status and body text.
    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let request = Request::get(path).body(Body::empty()).unwrap_or_default();
        let (status, bytes) = self.request(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Register an observer directly on the notifier, skipping the greeting.
    pub async fn observer(&self) -> mpsc::Receiver<String> {
        let mut observer = self.context.notifier.connect();
        let _ = observer.rx.recv().await;
        observer.rx
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Wait up to a second for the next frame and decode it.
pub async fn next_frame(rx: &mut mpsc::Receiver<String>) -> Option<serde_json::Value> {
    let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .ok()??;
    serde_json::from_str(&frame).ok()
}

/// Collect frames until `pred` matches one, or a second passes with none.
pub async fn wait_for_frame<F>(
    rx: &mut mpsc::Receiver<String>,
    mut pred: F,
) -> Option<serde_json::Value>
where
    F: FnMut(&serde_json::Value) -> bool,
{
    while let Some(frame) = next_frame(rx).await {
        if pred(&frame) {
            return Some(frame);
        }
    }
    None
}
