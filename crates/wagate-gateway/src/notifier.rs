// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime notifier: mirrors client lifecycle events to connected front ends.
//!
//! Every observer (one per WebSocket connection) gets its own bounded queue.
//! Frames are broadcast to all observers present at the time; there is no
//! backlog for observers that connect later.

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wagate_core::LifecycleEvent;

use crate::qr;

/// Per-observer queue depth before frames are dropped for that observer.
const OBSERVER_QUEUE: usize = 64;

/// Frame event names sent to observers.
pub mod frame_events {
    /// Free-form status text.
    pub const MESSAGE: &str = "message";
    /// QR image as a data URL.
    pub const QR: &str = "qr";
    /// Client became ready.
    pub const READY: &str = "ready";
    /// Client authenticated.
    pub const AUTHENTICATED: &str = "authenticated";
}

/// Human-readable status texts shown on the pairing page.
pub mod status {
    pub const CONNECTING: &str = "Menghubungkan...";
    pub const QR_AVAILABLE: &str = "QR Code tersedia!";
    pub const READY: &str = "Whatsapp sudah siap!";
    pub const AUTHENTICATED: &str = "Whatsapp sudah autentikasi!";
    pub const AUTH_FAILED: &str = "Autentikasi gagal, ulangi...";
    pub const DISCONNECTED: &str = "Whatsapp tidak konek!";
    pub const SESSION_SAVED: &str = "Sesi berhasil dibuat!";
    pub const SESSION_CLEARED: &str = "Sesi berhasil dihapus!";
    pub const RESTART_LIMIT: &str = "Batas koneksi ulang tercapai, restart manual diperlukan";
}

/// A server -> observer frame, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifierFrame {
    pub event: &'static str,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl NotifierFrame {
    pub fn new(event: &'static str, data: impl Into<String>) -> Self {
        Self {
            event,
            data: data.into(),
            payload: None,
        }
    }

    /// A plain `message` frame.
    pub fn message(text: impl Into<String>) -> Self {
        Self::new(frame_events::MESSAGE, text)
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    fn to_json(&self) -> String {
        // Serializing a struct of strings and a Value cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A registered observer's receiving side.
pub struct Observer {
    pub id: String,
    pub rx: mpsc::Receiver<String>,
}

/// Fan-out hub for observer connections.
#[derive(Default)]
pub struct Notifier {
    observers: DashMap<String, mpsc::Sender<String>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer. The greeting frame is already queued on return.
    pub fn connect(&self) -> Observer {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(OBSERVER_QUEUE);
        let greeting = NotifierFrame::message(status::CONNECTING).to_json();
        if tx.try_send(greeting).is_err() {
            warn!(observer = %id, "failed to queue greeting");
        }
        self.observers.insert(id.clone(), tx);
        debug!(observer = %id, total = self.observers.len(), "observer connected");
        Observer { id, rx }
    }

    /// Remove an observer.
    pub fn disconnect(&self, id: &str) {
        if self.observers.remove(id).is_some() {
            debug!(observer = %id, total = self.observers.len(), "observer disconnected");
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Send `frame` to every connected observer. Returns how many received it.
    ///
    /// Observers whose connection is gone are pruned; observers whose queue
    /// is full miss this frame.
    pub fn broadcast(&self, frame: &NotifierFrame) -> usize {
        let json = frame.to_json();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.observers.iter() {
            match entry.value().try_send(json.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(observer = %entry.key(), event = frame.event, "observer queue full, frame dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(entry.key().clone()),
            }
        }

        for id in closed {
            self.disconnect(&id);
        }
        delivered
    }

    /// Broadcast a plain status message.
    pub fn message(&self, text: impl Into<String>) -> usize {
        self.broadcast(&NotifierFrame::message(text))
    }
}

/// Frames relayed to observers for a lifecycle event, in send order.
pub fn frames_for(event: &LifecycleEvent) -> Vec<NotifierFrame> {
    match event {
        LifecycleEvent::QrAvailable { qr } => match qr::render_data_url(qr) {
            Ok(url) => vec![
                NotifierFrame::new(frame_events::QR, url),
                NotifierFrame::message(status::QR_AVAILABLE),
            ],
            Err(e) => {
                warn!(error = %e, "failed to render QR code");
                vec![NotifierFrame::message(e.to_string())]
            }
        },
        LifecycleEvent::Ready => vec![
            NotifierFrame::new(frame_events::READY, status::READY),
            NotifierFrame::message(status::READY),
        ],
        LifecycleEvent::Authenticated { credentials } => vec![
            NotifierFrame::new(frame_events::AUTHENTICATED, status::AUTHENTICATED)
                .with_payload(credentials.0.clone()),
            NotifierFrame::message(status::AUTHENTICATED),
        ],
        LifecycleEvent::AuthFailed { .. } => vec![NotifierFrame::message(status::AUTH_FAILED)],
        LifecycleEvent::Disconnected { .. } => vec![NotifierFrame::message(status::DISCONNECTED)],
    }
}

/// Relay lifecycle events from `rx` to all observers until cancelled or the
/// event stream closes.
pub fn spawn_relay(
    notifier: std::sync::Arc<Notifier>,
    mut rx: broadcast::Receiver<LifecycleEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = wagate_bus::next_event(&mut rx) => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            if let LifecycleEvent::QrAvailable { qr } = &event {
                info!("QR code available, scan it from the pairing page");
                debug!(qr = %qr, "raw QR payload");
            }

            for frame in frames_for(&event) {
                notifier.broadcast(&frame);
            }
        }
        debug!("notifier relay stopped");
    })
}
