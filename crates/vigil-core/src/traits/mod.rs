// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the seams between the Vigil core and its
//! external collaborators (backing store, SMTP relay).
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod notify;
pub mod store;

pub use notify::NotificationSink;
pub use store::EventStore;
