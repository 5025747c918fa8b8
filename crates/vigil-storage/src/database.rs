// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access is serialized through tokio-rusqlite's single background
//! thread, which also serializes insert vs. purge calls on the same record
//! class. Do NOT create additional Connection instances for writes.

use tokio_rusqlite::Connection;
use tracing::debug;
use vigil_core::VigilError;

use crate::migrations;

/// Handle to the single serialized SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply pragmas, and run
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, VigilError> {
        let conn = Connection::open(path).await.map_err(map_sql_err)?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(map_sql_err)?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(map_sql_err)?;
            conn.pragma_update(None, "foreign_keys", "ON")
                .map_err(map_sql_err)?;
            conn.pragma_update(None, "busy_timeout", 5000)
                .map_err(map_sql_err)?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(e) => e,
            e => VigilError::Storage {
                source: e.to_string().into(),
            },
        })?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying serialized connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close cleanly.
    pub async fn close(&self) -> Result<(), VigilError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> VigilError {
    VigilError::Storage {
        source: Box::new(e),
    }
}

/// Map a raw rusqlite error into the workspace error type.
pub fn map_sql_err(e: rusqlite::Error) -> VigilError {
    VigilError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        assert!(path.exists());

        // Both record-class tables exist after migration.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE type = 'table' AND name IN ('sensor_alerts', 'events')",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<i64, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        db.close().await.unwrap();

        // Migrations must not fail on an already-migrated database.
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        db.close().await.unwrap();
    }
}
