// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as bind addresses, country codes, and URL schemes.

use crate::diagnostic::ConfigError;
use crate::model::WagateConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every failure, keyed by its dotted config path; does not fail fast.
pub fn validate_config(config: &WagateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |key: &str, message: String| errors.push(ConfigError::validation(key, message));

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host", "must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':')
    {
        fail("server.host", format!("`{host}` is not an IP address or hostname"));
    }

    if config.server.port == 0 {
        fail("server.port", "must be between 1 and 65535".to_string());
    }

    if config.server.static_dir.trim().is_empty() {
        fail("server.static_dir", "must not be empty".to_string());
    }

    if config.session.file.trim().is_empty() {
        fail("session.file", "must not be empty".to_string());
    }

    let code = &config.phone.default_country_code;
    if code.is_empty() || code.len() > 3 || !code.chars().all(|c| c.is_ascii_digit()) {
        fail(
            "phone.default_country_code",
            format!("must be 1-3 digits, got `{code}`"),
        );
    }

    if !config.phone.suffix.starts_with('@') {
        fail(
            "phone.suffix",
            format!("must start with `@`, got `{}`", config.phone.suffix),
        );
    }

    let urls = std::iter::once(("bridge.base_url", Some(&config.bridge.base_url)))
        .chain(std::iter::once(("bridge.webhook_url", config.bridge.webhook_url.as_ref())));
    for (key, url) in urls {
        if let Some(url) = url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            fail(key, format!("must be an http:// or https:// URL, got `{url}`"));
        }
    }

    if config.bridge.instance_name.trim().is_empty() {
        fail("bridge.instance_name", "must not be empty".to_string());
    }

    if config.bridge.request_timeout_secs == 0 {
        fail("bridge.request_timeout_secs", "must be at least 1".to_string());
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        fail(
            "logging.level",
            format!(
                "must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.logging.level
            ),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
