// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket observer tests over a real TCP listener.

use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use wagate_core::{ClientState, LifecycleEvent};
use wagate_gateway::notifier::status;
use wagate_gateway::server;
use wagate_test_utils::TestHarness;

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn start(h: &TestHarness) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, h.router.clone(), h.cancel.clone()));
    format!("ws://{addr}/ws")
}

async fn next_json(socket: &mut Socket) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("frame within timeout")
            .expect("socket open")
            .expect("valid frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_for_observers(h: &TestHarness, n: usize) {
    for _ in 0..50 {
        if h.context.notifier.observer_count() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {n} observers, have {}", h.context.notifier.observer_count());
}

#[tokio::test]
async fn observer_is_greeted_then_receives_lifecycle_frames() {
    let h = TestHarness::builder()
        .with_client_state(ClientState::Uninitialized)
        .with_background()
        .build()
        .unwrap();
    let url = start(&h).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let greeting = next_json(&mut socket).await;
    assert_eq!(greeting["event"], "message");
    assert_eq!(greeting["data"], status::CONNECTING);

    h.client.emit(LifecycleEvent::QrAvailable {
        qr: "2@pairing".into(),
    });
    let qr = next_json(&mut socket).await;
    assert_eq!(qr["event"], "qr");
    assert!(qr["data"].as_str().unwrap().starts_with("data:image/svg+xml"));
    assert_eq!(next_json(&mut socket).await["data"], status::QR_AVAILABLE);
}

#[tokio::test]
async fn every_observer_gets_every_frame() {
    let h = TestHarness::builder().with_background().build().unwrap();
    let url = start(&h).await;

    let (mut a, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut b, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    next_json(&mut a).await;
    next_json(&mut b).await;
    wait_for_observers(&h, 2).await;

    h.client.emit(LifecycleEvent::AuthFailed {
        reason: "bad scan".into(),
    });
    assert_eq!(next_json(&mut a).await["data"], status::AUTH_FAILED);
    assert_eq!(next_json(&mut b).await["data"], status::AUTH_FAILED);
}

#[tokio::test]
async fn closing_the_socket_unregisters_the_observer() {
    let h = TestHarness::builder().build().unwrap();
    let url = start(&h).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    next_json(&mut socket).await;
    wait_for_observers(&h, 1).await;

    socket.close(None).await.unwrap();
    wait_for_observers(&h, 0).await;
}
