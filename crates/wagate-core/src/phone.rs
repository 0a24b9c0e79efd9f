// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination number normalization.
//!
//! Turns user input such as `0812-3456-789` or `+62 812 3456 789` into the
//! canonical address the network expects (`628123456789@c.us`).

use crate::error::GatewayError;

/// Shortest digit string accepted as a phone number.
const MIN_DIGITS: usize = 5;

/// E.164 caps numbers at 15 digits including the country code.
const MAX_DIGITS: usize = 15;

/// Normalizes destination numbers using a default country code and network suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneFormatter {
    country_code: String,
    suffix: String,
}

impl PhoneFormatter {
    /// Create a formatter, e.g. `PhoneFormatter::new("62", "@c.us")`.
    pub fn new(country_code: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            suffix: suffix.into(),
        }
    }

    /// Default country code applied to national-format numbers.
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Network-specific address suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Normalize `input` into canonical `<digits><suffix>` form.
    ///
    /// A leading `0` marks a national number and is replaced by the default
    /// country code. Everything that is not a digit is discarded.
    pub fn normalize(&self, input: &str) -> Result<String, GatewayError> {
        let trimmed = input.trim();
        let without_suffix = trimmed.strip_suffix(self.suffix.as_str()).unwrap_or(trimmed);

        let digits: String = without_suffix.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(GatewayError::InvalidNumber {
                input: input.to_string(),
                reason: "number contains no digits".to_string(),
            });
        }

        let international = match digits.strip_prefix('0') {
            Some(national) => format!("{}{national}", self.country_code),
            None => digits,
        };

        let len = international.len();
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&len) {
            return Err(GatewayError::InvalidNumber {
                input: input.to_string(),
                reason: format!(
                    "number must have between {MIN_DIGITS} and {MAX_DIGITS} digits, got {len}"
                ),
            });
        }

        Ok(format!("{international}{}", self.suffix))
    }

    /// Strip the suffix from a canonical address, leaving only digits.
    pub fn digits<'a>(&self, canonical: &'a str) -> &'a str {
        canonical.strip_suffix(self.suffix.as_str()).unwrap_or(canonical)
    }
}

impl Default for PhoneFormatter {
    fn default() -> Self {
        Self::new("62", "@c.us")
    }
}
