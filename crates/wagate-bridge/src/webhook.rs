// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook route receiving lifecycle events from the bridge.
//!
//! Deliveries are authorized by [`BridgeClient::ingest`]: the configured api
//! key when there is one, otherwise a loopback peer address. The peer address
//! comes from axum's `ConnectInfo`, so the app must be served with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{Extensions, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::Value;

use crate::client::{BridgeClient, Delivery};

/// Path the bridge is configured to post events to.
pub const WEBHOOK_PATH: &str = wagate_config::model::WEBHOOK_PATH;

/// Router exposing `POST /webhook/bridge`.
pub fn router(client: Arc<BridgeClient>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(receive))
        .with_state(client)
}

/// Authorized deliveries always get 200 so the bridge never retries;
/// unrecognized payloads are dropped.
async fn receive(
    State(client): State<Arc<BridgeClient>>,
    headers: HeaderMap,
    extensions: Extensions,
    Json(payload): Json<Value>,
) -> StatusCode {
    let presented = headers.get("apikey").and_then(|v| v.to_str().ok());
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match client.ingest(&payload, presented, peer) {
        Delivery::Published(_) => StatusCode::OK,
        Delivery::Ignored => {
            tracing::debug!(
                event = payload["event"].as_str().unwrap_or("<none>"),
                "ignored bridge webhook"
            );
            StatusCode::OK
        }
        Delivery::Rejected => StatusCode::UNAUTHORIZED,
    }
}
