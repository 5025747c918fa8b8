// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the EventStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use vigil_config::model::{RetentionConfig, StorageConfig};
use vigil_core::types::{EventRecord, RecordClass, RetentionPolicy, SensorAlertRecord};
use vigil_core::{EventStore, VigilError};

use crate::database::Database;
use crate::queries::{self, stored_timestamp};

/// SQLite-backed event store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`EventStore::initialize`].
///
/// The store owns the write-time half of the retention contract: a record
/// whose class has `lifespan_days == 0` is dropped before it ever reaches
/// the database, so it is never observable by a subsequent read. The
/// purge-time half (lifespans > 0) belongs to the
/// [`RetentionManager`](crate::retention::RetentionManager).
pub struct SqliteStore {
    config: StorageConfig,
    sensor_alert_policy: RetentionPolicy,
    event_policy: RetentionPolicy,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    pub fn new(config: StorageConfig, retention: &RetentionConfig) -> Self {
        Self {
            config,
            sensor_alert_policy: RetentionPolicy::new(
                RecordClass::SensorAlert,
                retention.sensor_alert_lifespan_days,
            ),
            event_policy: RetentionPolicy::new(RecordClass::Event, retention.events_lifespan_days),
            db: OnceCell::new(),
        }
    }

    /// The retention policy for a record class.
    pub fn policy(&self, class: RecordClass) -> RetentionPolicy {
        match class {
            RecordClass::SensorAlert => self.sensor_alert_policy,
            RecordClass::Event => self.event_policy,
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, VigilError> {
        self.db.get().ok_or_else(|| VigilError::Storage {
            source: "store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn initialize(&self) -> Result<(), VigilError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| VigilError::Storage {
            source: "store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), VigilError> {
        self.db()?.close().await
    }

    async fn insert_sensor_alert(&self, record: &SensorAlertRecord) -> Result<(), VigilError> {
        if self.sensor_alert_policy.retains_nothing() {
            debug!(id = %record.id, "sensor alert dropped: zero-lifespan policy");
            return Ok(());
        }
        queries::sensor_alerts::insert(self.db()?, record).await
    }

    async fn insert_event(&self, record: &EventRecord) -> Result<(), VigilError> {
        if self.event_policy.retains_nothing() {
            debug!(id = %record.id, "event dropped: zero-lifespan policy");
            return Ok(());
        }
        queries::events::insert(self.db()?, record).await
    }

    async fn delete_older_than(
        &self,
        class: RecordClass,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, VigilError> {
        let cutoff = stored_timestamp(cutoff);
        match class {
            RecordClass::SensorAlert => {
                queries::sensor_alerts::delete_older_than(self.db()?, &cutoff).await
            }
            RecordClass::Event => queries::events::delete_older_than(self.db()?, &cutoff).await,
        }
    }

    async fn count(&self, class: RecordClass) -> Result<u64, VigilError> {
        match class {
            RecordClass::SensorAlert => queries::sensor_alerts::count(self.db()?).await,
            RecordClass::Event => queries::events::count(self.db()?).await,
        }
    }
}
