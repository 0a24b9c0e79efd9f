// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint for the pairing page.
//!
//! Server -> Client only (JSON):
//! ```json
//! {"event": "message", "data": "Menghubungkan..."}
//! {"event": "qr", "data": "data:image/svg+xml;base64,..."}
//! {"event": "ready", "data": "Whatsapp sudah siap!"}
//! {"event": "authenticated", "data": "Whatsapp sudah autentikasi!", "payload": {...}}
//! ```
//!
//! Anything the client sends is ignored apart from close frames.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use crate::server::GatewayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Pump notifier frames into one WebSocket until either side goes away.
async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let observer = state.notifier.connect();
    let observer_id = observer.id.clone();
    let mut rx = observer.rx;

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    state.notifier.disconnect(&observer_id);
    sender_task.abort();
}
