// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of bridge webhook payloads into lifecycle events.
//!
//! The bridge posts `{"event": "...", "instance": "...", "data": {...}}`.
//! Event names arrive either dotted (`qrcode.updated`) or upper snake case
//! (`QRCODE_UPDATED`) depending on how the bridge is configured; both are
//! accepted.

use serde_json::Value;

use wagate_core::{CredentialBlob, LifecycleEvent};

/// Extract the raw QR payload from a bridge response or webhook `data` object.
///
/// Prefers the raw `code` (which the notifier renders itself) over
/// pre-rendered images.
pub fn extract_qr(value: &Value) -> Option<String> {
    value["qrcode"]["code"]
        .as_str()
        .or_else(|| value["code"].as_str())
        .or_else(|| value["qrcode"].as_str().filter(|s| !s.starts_with("data:")))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map a webhook payload to a lifecycle event. Unknown or uninteresting
/// payloads yield `None`.
pub fn parse_webhook(payload: &Value) -> Option<LifecycleEvent> {
    let event = payload["event"].as_str()?.to_ascii_lowercase().replace('_', ".");
    let data = &payload["data"];

    match event.as_str() {
        "qrcode.updated" => extract_qr(data).map(|qr| LifecycleEvent::QrAvailable { qr }),
        "creds.update" => {
            if data.is_null() {
                None
            } else {
                Some(LifecycleEvent::Authenticated {
                    credentials: CredentialBlob(data.clone()),
                })
            }
        }
        "connection.update" => match data["state"].as_str()? {
            "open" => Some(LifecycleEvent::Ready),
            "close" => Some(LifecycleEvent::Disconnected {
                reason: reason(data, "connection closed"),
            }),
            "refused" => Some(LifecycleEvent::AuthFailed {
                reason: reason(data, "authentication refused"),
            }),
            _ => None,
        },
        "logout.instance" => Some(LifecycleEvent::Disconnected {
            reason: reason(data, "logged out"),
        }),
        _ => None,
    }
}

fn reason(data: &Value, fallback: &str) -> String {
    match &data["statusReason"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => fallback.to_string(),
    }
}
