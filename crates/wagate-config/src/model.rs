// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the wagate gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level tables, in the order they appear in [`WagateConfig`].
pub const SECTIONS: &[&str] = &["server", "session", "phone", "bridge", "reconnect", "logging"];

/// Route the bridge posts lifecycle events to.
pub const WEBHOOK_PATH: &str = "/webhook/bridge";

/// Top-level wagate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WagateConfig {
    /// HTTP listener and static asset settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Credential file settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Destination number normalization settings.
    #[serde(default)]
    pub phone: PhoneConfig,

    /// Browser-automation bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Automatic re-initialization after disconnects.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WagateConfig {
    /// URL handed to the bridge for webhook delivery.
    ///
    /// Without an explicit `bridge.webhook_url` this is the local listener on
    /// `server.port`, so a `PORT` override moves it along.
    pub fn webhook_url(&self) -> String {
        match &self.bridge.webhook_url {
            Some(url) => url.clone(),
            None => format!("http://127.0.0.1:{}{WEBHOOK_PATH}", self.server.port),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. The bare `PORT` environment variable overrides this.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the front-end page (`index.html`) and its assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_static_dir() -> String {
    "public".to_string()
}

/// Credential file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Path of the JSON credential file.
    #[serde(default = "default_session_file")]
    pub file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: default_session_file(),
        }
    }
}

fn default_session_file() -> String {
    "./sesi.json".to_string()
}

/// Destination number normalization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PhoneConfig {
    /// Country code that replaces the leading `0` of national numbers.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    /// Network-specific address suffix.
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            default_country_code: default_country_code(),
            suffix: default_suffix(),
        }
    }
}

fn default_country_code() -> String {
    "62".to_string()
}

fn default_suffix() -> String {
    "@c.us".to_string()
}

/// Browser-automation bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the bridge HTTP API.
    #[serde(default = "default_bridge_url")]
    pub base_url: String,

    /// API key sent in the `apikey` header. When set, webhook deliveries
    /// must present the same key; when unset, only loopback peers may post
    /// to the webhook.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Session (instance) name on the bridge.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// URL the bridge posts lifecycle webhooks to. Defaults to the local
    /// listener, see [`WagateConfig::webhook_url`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            api_key: None,
            instance_name: default_instance_name(),
            webhook_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:8085".to_string()
}

fn default_instance_name() -> String {
    "wagate".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Reconnect policy applied when the client reports a disconnect.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    /// Maximum consecutive automatic re-initializations. `None` = unbounded.
    /// The counter resets once the client becomes ready again.
    #[serde(default)]
    pub max_restarts: Option<u32>,

    /// Delay before each automatic re-initialization, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_restarts: None,
            delay_ms: default_reconnect_delay_ms(),
        }
    }
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
