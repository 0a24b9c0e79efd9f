// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wagate integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a running bridge.
//!
//! # Components
//!
//! - [`MockMessagingClient`] - Scripted client with event injection and call capture
//! - [`MockCredentialStore`] - In-memory store with failure injection
//! - [`TestHarness`] - Full router wired to both mocks

pub mod harness;
pub mod mock_client;
pub mod mock_store;

pub use harness::{TestHarness, next_frame, wait_for_frame};
pub use mock_client::MockMessagingClient;
pub use mock_store::MockCredentialStore;
