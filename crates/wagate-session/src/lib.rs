// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session credential persistence for the wagate gateway.
//!
//! Stores the single most recent credential blob as a JSON file. Absence of
//! the file means "unauthenticated"; presence means "attempt to resume".

pub mod store;

pub use store::FileSessionStore;
