// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic update checks for the Vigil monitoring client.
//!
//! The [`UpdateChecker`] fetches a JSON version manifest over HTTPS and
//! compares it against the running version; the [`UpdateScheduler`] runs
//! it on a cadence and feeds outcomes to the alarm dispatcher.

pub mod checker;
pub mod scheduler;

pub use checker::{UpdateChecker, UpdateStatus};
pub use scheduler::UpdateScheduler;
