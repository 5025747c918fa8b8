// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event record operations.

use rusqlite::params;
use vigil_core::VigilError;

use crate::database::Database;
use crate::models::EventRecord;

/// Insert an event record.
pub async fn insert(db: &Database, record: &EventRecord) -> Result<(), VigilError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO events (id, kind, data, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![record.id, record.kind, record.data, record.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete all events created strictly before `cutoff` (stored timestamp
/// format). Returns the number of rows removed.
pub async fn delete_older_than(db: &Database, cutoff: &str) -> Result<u64, VigilError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM events WHERE created_at < ?1", params![cutoff])?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count the events currently stored.
pub async fn count(db: &Database) -> Result<u64, VigilError> {
    db.connection()
        .call(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List events in chronological order, newest last.
pub async fn list(db: &Database) -> Result<Vec<EventRecord>, VigilError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, data, created_at FROM events ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(EventRecord {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    data: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
