// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backing-store trait for the two time-stamped record classes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::VigilError;
use crate::types::{EventRecord, RecordClass, SensorAlertRecord};

/// Adapter for the relational backing store.
///
/// Implementations must serialize insert and delete calls on the same
/// record class so the zero-lifespan immediate-delete guarantee holds:
/// a record of a class whose policy retains nothing is never observable
/// by a read issued after its insert call returns.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Opens the store and runs pending migrations.
    async fn initialize(&self) -> Result<(), VigilError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), VigilError>;

    /// Persist a sensor alert, honoring the write-time retention hook.
    async fn insert_sensor_alert(&self, record: &SensorAlertRecord) -> Result<(), VigilError>;

    /// Persist an event, honoring the write-time retention hook.
    async fn insert_event(&self, record: &EventRecord) -> Result<(), VigilError>;

    /// Delete all records of `class` created strictly before `cutoff`.
    ///
    /// Returns the number of rows deleted. Deleting already-deleted
    /// records is not an error; a cycle with no eligible rows returns 0.
    async fn delete_older_than(
        &self,
        class: RecordClass,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, VigilError>;

    /// Count the records of `class` currently in the store.
    async fn count(&self, class: RecordClass) -> Result<u64, VigilError>;
}
