// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use wagate_core::{GatewayError, MessagingClient, PhoneFormatter};

use crate::handlers;
use crate::notifier::Notifier;
use crate::ws;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub client: Arc<dyn MessagingClient>,
    pub formatter: Arc<PhoneFormatter>,
    pub notifier: Arc<Notifier>,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors `ServerConfig` from wagate-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Directory holding the pairing page; must contain `index.html`.
    pub static_dir: PathBuf,
}

/// Build the gateway router.
///
/// Routes:
/// - POST /send-message, POST /kirim-pesan
/// - GET /health
/// - GET /ws (observer WebSocket)
/// - GET / and any other path from `static_dir`
/// - anything routed by `extra` (e.g. the bridge webhook), outside the CORS
///   layer so browsers cannot post to it cross-origin
pub fn build_router(
    config: &ServerConfig,
    state: GatewayState,
    extra: Router,
) -> Result<Router, GatewayError> {
    let index = config.static_dir.join("index.html");
    if !index.is_file() {
        return Err(GatewayError::Config(format!(
            "pairing page not found at {}",
            index.display()
        )));
    }

    let api_routes = Router::new()
        .route("/send-message", post(handlers::send_message))
        .route("/kirim-pesan", post(handlers::send_message))
        .route("/health", get(handlers::get_health))
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    let app = Router::new()
        .merge(api_routes)
        .route_service("/", ServeFile::new(&index))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .merge(extra)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Bind the configured host:port.
pub async fn bind(config: &ServerConfig) -> Result<tokio::net::TcpListener, GatewayError> {
    let addr = format!("{}:{}", config.host, config.port);
    tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::Network {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Serve `app` on an already bound listener until `cancel` fires.
///
/// Handlers can read the peer address through `ConnectInfo<SocketAddr>`.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> Result<(), GatewayError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway server listening on {addr}");
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| GatewayError::Network {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
