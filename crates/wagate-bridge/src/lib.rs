// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging client facade over a WhatsApp Web browser-automation bridge.
//!
//! The bridge runs the headless browser session and exposes it over HTTP.
//! [`BridgeClient`] implements [`wagate_core::MessagingClient`] on top of it;
//! lifecycle events arrive through the webhook route in [`webhook`].

pub mod client;
pub mod events;
pub mod webhook;

pub use client::{BridgeClient, Delivery};
