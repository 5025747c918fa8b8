// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer and retention lifecycle for the Vigil
//! monitoring client.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, typed query
//! modules for the two record classes, and the [`RetentionManager`] that
//! enforces age-based purging.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod retention;
pub mod store;

pub use database::Database;
pub use models::*;
pub use retention::{CycleReport, RetentionManager};
pub use store::SqliteStore;
