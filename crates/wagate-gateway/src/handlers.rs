// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles POST /send-message (and its /kirim-pesan alias) and GET /health.

use std::collections::HashMap;

use axum::{
    Form, Json,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use wagate_core::{ClientState, FieldErrors, GatewayError};

use crate::server::GatewayState;

/// Reason reported for a missing or empty request field.
pub const INVALID_VALUE: &str = "Invalid value";

/// Message returned when the recipient has no account.
pub const NOT_REGISTERED: &str = "Nomor tidak terdaftar!";

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub client_state: ClientState,
    pub observers: usize,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error surfaced by an API handler.
#[derive(Debug)]
pub enum ApiError {
    /// Body could not be decoded at all.
    BadRequest(String),
    /// Any domain error; status and body follow the error kind.
    Gateway(GatewayError),
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        ApiError::Gateway(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({"status": false, "message": message}),
            ),
            ApiError::Gateway(e) => (
                StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                gateway_body(e),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Caller errors answer under `message`, server errors under `response`.
fn gateway_body(e: GatewayError) -> Value {
    match e {
        GatewayError::Validation(fields) => json!({"status": false, "message": fields}),
        GatewayError::InvalidNumber { reason, .. } => {
            json!({"status": false, "message": {"number": reason}})
        }
        GatewayError::RecipientNotRegistered => json!({"status": false, "message": NOT_REGISTERED}),
        other => json!({"status": false, "response": other.to_string()}),
    }
}

/// Validated send request.
#[derive(Debug, PartialEq, Eq)]
pub struct SendRequest {
    pub number: String,
    pub message: String,
}

impl SendRequest {
    /// Pull `number` and `message` out of a decoded body.
    ///
    /// Numbers are accepted as well as strings; anything else, a blank
    /// string, or an absent key counts as invalid. All offending fields are
    /// reported together.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, GatewayError> {
        let mut errors = FieldErrors::new();
        let number = field_text(fields, "number", &mut errors);
        let message = field_text(fields, "message", &mut errors);

        match (number, message) {
            (Some(number), Some(message)) if errors.is_empty() => Ok(Self { number, message }),
            _ => Err(GatewayError::Validation(errors)),
        }
    }
}

fn field_text(fields: &Map<String, Value>, name: &str, errors: &mut FieldErrors) -> Option<String> {
    let text = match fields.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if text.trim().is_empty() {
        errors.insert(name.to_string(), INVALID_VALUE.to_string());
        None
    } else {
        Some(text)
    }
}

/// Decode a JSON or URL-encoded body into a field map.
///
/// Bodies of any other content type, and empty bodies, decode to no fields
/// so that validation reports what is missing.
async fn decode_fields(request: Request) -> Result<Map<String, Value>, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(form) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        return Ok(form
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect());
    }

    if content_type.starts_with("application/json") || content_type.ends_with("+json") {
        let bytes = Bytes::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        if bytes.is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::BadRequest(format!("malformed JSON body: {e}")))?;
        return Ok(match value {
            Value::Object(map) => map,
            _ => Map::new(),
        });
    }

    debug!(content_type = %content_type, "unsupported body type, treating as empty");
    Ok(Map::new())
}

/// POST /send-message
///
/// Validates the request, normalizes the destination, checks the recipient
/// is registered, then sends the text.
pub async fn send_message(State(state): State<GatewayState>, request: Request) -> Response {
    match send_message_inner(&state, request).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(json!({"status": true, "response": receipt})),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn send_message_inner(state: &GatewayState, request: Request) -> Result<Value, ApiError> {
    let fields = decode_fields(request).await?;
    let req = SendRequest::from_fields(&fields)?;
    let number = state.formatter.normalize(&req.number)?;

    let registered = state.client.is_registered(&number).await.map_err(|e| {
        warn!(error = %e, "registration lookup failed");
        e
    })?;
    if !registered {
        debug!(number = %number, "recipient not registered");
        return Err(GatewayError::RecipientNotRegistered.into());
    }

    let receipt = state.client.send(&number, &req.message).await.map_err(|e| {
        warn!(error = %e, "send failed");
        e
    })?;
    Ok(receipt.0)
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        client_state: state.client.state(),
        observers: state.notifier.observer_count(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}
