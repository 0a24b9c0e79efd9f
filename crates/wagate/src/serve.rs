// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wagate serve` command implementation.
//!
//! Wires the bridge-backed messaging client, the file session store, and the
//! HTTP gateway together, then runs until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use wagate_bridge::{BridgeClient, webhook};
use wagate_bus::EventBus;
use wagate_config::WagateConfig;
use wagate_core::{CredentialStore, GatewayError, HealthStatus, PhoneFormatter, PluginAdapter};
use wagate_gateway::{GatewayContext, ReconnectPolicy, ServerConfig, server};
use wagate_session::FileSessionStore;

use crate::shutdown;

/// Runs the `wagate serve` command.
pub async fn run_serve(config: WagateConfig) -> Result<(), GatewayError> {
    init_tracing(&config.logging.level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting wagate serve");

    let formatter = PhoneFormatter::new(
        config.phone.default_country_code.clone(),
        config.phone.suffix.clone(),
    );

    let client = Arc::new(BridgeClient::new(
        config.bridge.clone(),
        config.webhook_url(),
        formatter.clone(),
        EventBus::default(),
    )?);
    let store = Arc::new(FileSessionStore::new(&config.session.file));
    report_health(store.as_ref()).await;

    let policy = ReconnectPolicy {
        max_restarts: config.reconnect.max_restarts,
        delay: Duration::from_millis(config.reconnect.delay_ms),
    };
    let context = GatewayContext::new(client.clone(), store.clone(), formatter, policy);

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        static_dir: PathBuf::from(&config.server.static_dir),
    };
    let app = context.router(&server_config, webhook::router(client.clone()))?;
    let prior = context.load_session().await?;
    let listener = server::bind(&server_config).await?;

    let cancel = shutdown::install_signal_handler();
    let tasks = context.spawn_background(&cancel);

    let server_task = tokio::spawn(server::serve(listener, app, cancel.clone()));

    // Failures are already relayed to observers; the HTTP API keeps serving.
    if let Err(e) = context.initialize_client(prior).await {
        warn!(error = %e, "continuing without an initialized client");
    }

    let result = match server_task.await {
        Ok(result) => result,
        Err(e) => Err(GatewayError::Internal(format!("server task failed: {e}"))),
    };
    cancel.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }

    if let Err(e) = client.shutdown().await {
        error!(error = %e, "client shutdown failed");
    }
    if let Err(e) = store.shutdown().await {
        error!(error = %e, "session store shutdown failed");
    }

    info!("wagate stopped");
    result
}

/// Log adapter health once at startup.
async fn report_health(store: &dyn CredentialStore) {
    match store.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = store.name(), "adapter healthy"),
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(adapter = store.name(), reason = %reason, "adapter degraded")
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            error!(adapter = store.name(), reason = %reason, "adapter unhealthy")
        }
        Err(e) => error!(adapter = store.name(), error = %e, "health check failed"),
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wagate={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
