// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the browser-automation bridge.
//!
//! Endpoints used (relative to `bridge.base_url`, `{name}` = instance name):
//! - `POST /instance/create`           start a session, may return a QR code
//! - `GET  /instance/connect/{name}`   reconnect an existing session
//! - `POST /chat/whatsappNumbers/{name}` registration check
//! - `POST /message/sendText/{name}`   send a text message

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use wagate_bus::EventBus;
use wagate_config::model::BridgeConfig;
use wagate_core::{
    AdapterType, ClientState, CredentialBlob, GatewayError, HealthStatus, LifecycleEvent,
    MessageReceipt, MessagingClient, PhoneFormatter, PluginAdapter,
};

use crate::events::{extract_qr, parse_webhook};

/// Outcome of one webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Translated, applied to the client state, and published.
    Published(LifecycleEvent),
    /// Authorized but not an event the gateway tracks.
    Ignored,
    /// Failed authorization; nothing was applied.
    Rejected,
}

/// Messaging client backed by a browser-automation bridge.
///
/// Commands go out over HTTP; lifecycle progress comes back through
/// [`ingest`](BridgeClient::ingest), fed by the bridge's webhook.
pub struct BridgeClient {
    http: reqwest::Client,
    config: BridgeConfig,
    webhook_url: String,
    formatter: PhoneFormatter,
    state: watch::Sender<ClientState>,
    bus: EventBus<LifecycleEvent>,
}

impl BridgeClient {
    /// Create a client. No network traffic happens until [`MessagingClient::initialize`].
    pub fn new(
        config: BridgeConfig,
        webhook_url: String,
        formatter: PhoneFormatter,
        bus: EventBus<LifecycleEvent>,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build bridge HTTP client: {e}")))?;
        let (state, _) = watch::channel(ClientState::Uninitialized);
        Ok(Self {
            http,
            config,
            webhook_url,
            formatter,
            state,
            bus,
        })
    }

    /// Feed a webhook payload from the bridge.
    ///
    /// `presented_key` is the `apikey` request header; the bridge may also
    /// carry the key in the payload. `peer` is the remote address, when known.
    /// Recognized events from an authorized sender update the connection
    /// state and are published to subscribers.
    pub fn ingest(&self, payload: &Value, presented_key: Option<&str>, peer: Option<IpAddr>) -> Delivery {
        if !self.webhook_authorized(payload, presented_key, peer) {
            warn!(peer = ?peer, "rejected unauthorized bridge webhook");
            return Delivery::Rejected;
        }

        match parse_webhook(payload) {
            Some(event) => {
                self.apply(event.clone());
                Delivery::Published(event)
            }
            None => Delivery::Ignored,
        }
    }

    /// With an api key configured, the delivery must carry exactly that key.
    /// Without one, only loopback peers are trusted.
    fn webhook_authorized(&self, payload: &Value, presented_key: Option<&str>, peer: Option<IpAddr>) -> bool {
        match self.config.api_key.as_deref() {
            Some(expected) => presented_key.or_else(|| payload["apikey"].as_str()) == Some(expected),
            None => peer.is_some_and(|ip| ip.to_canonical().is_loopback()),
        }
    }

    fn apply(&self, event: LifecycleEvent) {
        let mut transition = (ClientState::Uninitialized, ClientState::Uninitialized);
        self.state.send_modify(|state| {
            let next = state.on_event(&event);
            transition = (*state, next);
            *state = next;
        });
        let (from, to) = transition;
        if from != to {
            info!(event = event.name(), from = %from, to = %to, "client state changed");
        } else {
            debug!(event = event.name(), state = %to, "lifecycle event");
        }
        self.bus.publish(event);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.config.api_key {
            Some(key) => builder.header("apikey", key),
            None => builder,
        }
    }

    fn ensure_ready(&self) -> Result<(), GatewayError> {
        let state = *self.state.borrow();
        if state.accepts_commands() {
            Ok(())
        } else {
            Err(GatewayError::NotReady { state })
        }
    }

    async fn connect_existing(&self) -> Result<Value, GatewayError> {
        let path = format!("/instance/connect/{}", self.config.instance_name);
        let resp = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|e| GatewayError::network("bridge connect request failed", e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::network("failed to read bridge connect response", e))?;
        if !status.is_success() {
            return Err(GatewayError::Network {
                message: format!("bridge rejected connect ({status}): {text}"),
                source: None,
            });
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}

/// Whether a create failure means the instance is already there.
fn is_already_exists(status: StatusCode, body: &str) -> bool {
    let lower = body.to_lowercase();
    matches!(status, StatusCode::CONFLICT | StatusCode::FORBIDDEN)
        && (lower.contains("already") || lower.contains("exists") || lower.contains("in use"))
}

#[async_trait]
impl PluginAdapter for BridgeClient {
    fn name(&self) -> &str {
        "bridge"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        let state = *self.state.borrow();
        Ok(match state {
            ClientState::Ready => HealthStatus::Healthy,
            ClientState::AuthFailed => HealthStatus::Unhealthy("authentication failed".into()),
            other => HealthStatus::Degraded(format!("client {other}")),
        })
    }

    async fn shutdown(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingClient for BridgeClient {
    async fn initialize(&self, prior: Option<CredentialBlob>) -> Result<(), GatewayError> {
        let mut body = json!({
            "instanceName": self.config.instance_name,
            "qrcode": true,
            "webhook": self.webhook_url,
        });
        let with_stored_session = prior.is_some();
        if let Some(blob) = prior {
            body["session"] = blob.0;
        }

        info!(
            instance = %self.config.instance_name,
            with_stored_session,
            "initializing messaging client"
        );

        let resp = self
            .request(Method::POST, "/instance/create")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network("bridge create request failed", e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::network("failed to read bridge create response", e))?;

        let response = if status.is_success() {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        } else if is_already_exists(status, &text) {
            // The connect endpoint takes no session: an existing instance
            // resumes whatever session the bridge itself still holds.
            if with_stored_session {
                warn!("bridge instance already exists; stored session not sent, bridge keeps its own");
            } else {
                info!("bridge instance already exists, reconnecting");
            }
            self.connect_existing().await?
        } else {
            return Err(GatewayError::Network {
                message: format!("bridge rejected create ({status}): {text}"),
                source: None,
            });
        };

        if let Some(qr) = extract_qr(&response) {
            self.apply(LifecycleEvent::QrAvailable { qr });
        }
        Ok(())
    }

    fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.bus.subscribe()
    }

    async fn is_registered(&self, number: &str) -> Result<bool, GatewayError> {
        self.ensure_ready()?;

        let path = format!("/chat/whatsappNumbers/{}", self.config.instance_name);
        let digits = self.formatter.digits(number);
        let resp = self
            .request(Method::POST, &path)
            .json(&json!({ "numbers": [digits] }))
            .send()
            .await
            .map_err(|e| GatewayError::network("registration check failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .map_err(|e| GatewayError::network("failed to read registration response", e))?;
            return Err(GatewayError::Network {
                message: format!("registration check rejected ({status}): {text}"),
                source: None,
            });
        }

        let entries: Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::network("malformed registration response", e))?;

        let exists = entries
            .as_array()
            .and_then(|list| list.first())
            .and_then(|entry| entry["exists"].as_bool())
            .unwrap_or(false);
        debug!(number = digits, exists, "registration check");
        Ok(exists)
    }

    async fn send(&self, number: &str, body: &str) -> Result<MessageReceipt, GatewayError> {
        self.ensure_ready()?;

        let path = format!("/message/sendText/{}", self.config.instance_name);
        let digits = self.formatter.digits(number);
        let resp = self
            .request(Method::POST, &path)
            .json(&json!({ "number": digits, "text": body }))
            .send()
            .await
            .map_err(|e| GatewayError::Send {
                message: format!("bridge send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            warn!(error = %e, "bridge send response unreadable");
            GatewayError::Send {
                message: format!("failed to read bridge send response: {e}"),
                source: Some(Box::new(e)),
            }
        })?;
        if !status.is_success() {
            return Err(GatewayError::Send {
                message: format!("bridge rejected message ({status}): {text}"),
                source: None,
            });
        }

        info!(number = digits, "message sent");
        let receipt = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(MessageReceipt(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_bus::next_event;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_with_key(base_url: String, api_key: Option<&str>) -> BridgeClient {
        let config = BridgeConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            instance_name: "wagate".into(),
            webhook_url: None,
            request_timeout_secs: 5,
        };
        BridgeClient::new(
            config,
            "http://127.0.0.1:8000/webhook/bridge".into(),
            PhoneFormatter::default(),
            EventBus::default(),
        )
        .unwrap()
    }

    fn client_for(server: &MockServer) -> BridgeClient {
        client_with_key(server.uri(), Some("k"))
    }

    fn make_ready(client: &BridgeClient) {
        let delivery = client.ingest(
            &json!({"event": "connection.update", "data": {"state": "open"}}),
            Some("k"),
            None,
        );
        assert_eq!(delivery, Delivery::Published(LifecycleEvent::Ready));
    }

    fn loopback() -> Option<IpAddr> {
        Some(IpAddr::from([127, 0, 0, 1]))
    }

    #[tokio::test]
    async fn commands_are_refused_before_ready() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let err = client.is_registered("628123@c.us").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::NotReady {
                state: ClientState::Uninitialized
            }
        ));
        let err = client.send("628123@c.us", "hi").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotReady { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn initialize_publishes_qr_from_create_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/instance/create"))
            .and(header("apikey", "k"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "instance": {"instanceName": "wagate"},
                "qrcode": {"code": "2@qr-payload", "base64": "data:image/png;base64,AAA"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut rx = client.subscribe();
        client.initialize(None).await.unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            Some(LifecycleEvent::QrAvailable {
                qr: "2@qr-payload".into()
            })
        );
        assert_eq!(client.state(), ClientState::AwaitingScan);
    }

    #[tokio::test]
    async fn initialize_forwards_prior_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/instance/create"))
            .and(body_json(json!({
                "instanceName": "wagate",
                "qrcode": true,
                "webhook": "http://127.0.0.1:8000/webhook/bridge",
                "session": {"token": "abc"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .initialize(Some(CredentialBlob(json!({"token": "abc"}))))
            .await
            .unwrap();
        assert_eq!(client.state(), ClientState::Uninitialized);
    }

    #[tokio::test]
    async fn existing_instance_reconnects_without_resending_stored_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/instance/create"))
            .respond_with(ResponseTemplate::new(409).set_body_string("instance already exists"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/instance/connect/wagate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .initialize(Some(CredentialBlob(json!({"token": "abc"}))))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let create: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(create["session"], json!({"token": "abc"}));
        assert_eq!(requests[1].method.as_str(), "GET");
        assert!(requests[1].body.is_empty());
        assert_eq!(client.state(), ClientState::Uninitialized);
    }

    #[tokio::test]
    async fn initialize_falls_back_to_connect_when_instance_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/instance/create"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string("instance name already in use"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/instance/connect/wagate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "2@again"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.initialize(None).await.unwrap();
        assert_eq!(client.state(), ClientState::AwaitingScan);
    }

    #[tokio::test]
    async fn initialize_surfaces_bridge_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/instance/create"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.initialize(None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Network { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn registration_check_reads_exists_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/whatsappNumbers/wagate"))
            .and(body_json(json!({"numbers": ["628123456789"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"exists": true, "jid": "628123456789@s.whatsapp.net", "number": "628123456789"}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        make_ready(&client);
        assert!(client.is_registered("628123456789@c.us").await.unwrap());
    }

    #[tokio::test]
    async fn registration_check_defaults_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/whatsappNumbers/wagate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        make_ready(&client);
        assert!(!client.is_registered("628000000000@c.us").await.unwrap());
    }

    #[tokio::test]
    async fn send_returns_provider_receipt_verbatim() {
        let server = MockServer::start().await;
        let receipt = json!({"key": {"id": "BAE5F0", "remoteJid": "628123456789@s.whatsapp.net"}, "status": "PENDING"});
        Mock::given(method("POST"))
            .and(path("/message/sendText/wagate"))
            .and(body_json(json!({"number": "628123456789", "text": "hi"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(receipt.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        make_ready(&client);
        let got = client.send("628123456789@c.us", "hi").await.unwrap();
        assert_eq!(got, MessageReceipt(receipt));
    }

    #[tokio::test]
    async fn send_failure_is_send_error_with_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/wagate"))
            .respond_with(ResponseTemplate::new(400).set_body_string("number not on whatsapp"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        make_ready(&client);
        let err = client.send("628123456789@c.us", "hi").await.unwrap_err();
        assert!(matches!(err, GatewayError::Send { .. }));
        assert!(err.to_string().contains("number not on whatsapp"));
    }

    #[tokio::test]
    async fn ingest_updates_state_and_publishes() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let mut rx = client.subscribe();

        client.ingest(
            &json!({"event": "qrcode.updated", "data": {"qrcode": {"code": "2@a"}}}),
            Some("k"),
            None,
        );
        client.ingest(
            &json!({"event": "creds.update", "apikey": "k", "data": {"token": "t"}}),
            None,
            None,
        );
        make_ready(&client);

        assert!(matches!(
            next_event(&mut rx).await,
            Some(LifecycleEvent::QrAvailable { .. })
        ));
        assert!(matches!(
            next_event(&mut rx).await,
            Some(LifecycleEvent::Authenticated { .. })
        ));
        assert_eq!(next_event(&mut rx).await, Some(LifecycleEvent::Ready));
        assert_eq!(client.state(), ClientState::Ready);
        assert_eq!(client.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn webhook_without_key_is_rejected_when_key_configured() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let mut rx = client.subscribe();

        let forged = json!({"event": "creds.update", "data": {"attacker": "blob"}});
        assert_eq!(client.ingest(&forged, None, loopback()), Delivery::Rejected);
        let open = json!({"event": "connection.update", "data": {"state": "open"}});
        assert_eq!(client.ingest(&open, None, loopback()), Delivery::Rejected);

        assert_eq!(client.state(), ClientState::Uninitialized);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn webhook_with_wrong_key_is_rejected() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let open = json!({"event": "connection.update", "data": {"state": "open"}});
        assert_eq!(client.ingest(&open, Some("wrong"), None), Delivery::Rejected);

        let in_body = json!({"event": "connection.update", "apikey": "wrong", "data": {"state": "open"}});
        assert_eq!(client.ingest(&in_body, None, None), Delivery::Rejected);

        // A correct key in the body does not rescue a wrong header.
        let mixed = json!({"event": "connection.update", "apikey": "k", "data": {"state": "open"}});
        assert_eq!(client.ingest(&mixed, Some("wrong"), None), Delivery::Rejected);
        assert_eq!(client.state(), ClientState::Uninitialized);
    }

    #[tokio::test]
    async fn keyless_webhook_only_trusts_loopback_peers() {
        let client = client_with_key("http://127.0.0.1:9".into(), None);
        let open = json!({"event": "connection.update", "data": {"state": "open"}});

        assert_eq!(
            client.ingest(&open, None, Some(IpAddr::from([203, 0, 113, 7]))),
            Delivery::Rejected
        );
        assert_eq!(client.ingest(&open, None, None), Delivery::Rejected);
        assert_eq!(client.state(), ClientState::Uninitialized);

        let mapped: IpAddr = "::ffff:127.0.0.1".parse().unwrap();
        assert_eq!(
            client.ingest(&open, None, Some(mapped)),
            Delivery::Published(LifecycleEvent::Ready)
        );
        assert_eq!(client.state(), ClientState::Ready);
    }

    #[tokio::test]
    async fn unrecognized_event_is_ignored() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let upsert = json!({"event": "messages.upsert", "data": {}});
        assert_eq!(client.ingest(&upsert, Some("k"), None), Delivery::Ignored);
    }

    /// Serves one response whose body is cut short of its Content-Length.
    async fn truncated_body_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.ends_with(b"}") {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 100\r\n\r\n{\"key\"")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn unreadable_send_response_is_a_send_error() {
        let client = client_with_key(truncated_body_server().await, Some("k"));
        make_ready(&client);

        let err = client.send("628123456789@c.us", "hi").await.unwrap_err();
        match err {
            GatewayError::Send { message, source } => {
                assert!(message.contains("failed to read bridge send response"));
                assert!(source.is_some());
            }
            other => panic!("expected Send, got {other:?}"),
        }
    }
}
