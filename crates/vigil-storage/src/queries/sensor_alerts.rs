// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sensor-alert record operations.

use rusqlite::params;
use vigil_core::VigilError;

use crate::database::Database;
use crate::models::SensorAlertRecord;

/// Insert a sensor-alert record.
pub async fn insert(db: &Database, record: &SensorAlertRecord) -> Result<(), VigilError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sensor_alerts (id, sensor_id, state, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.sensor_id,
                    record.state,
                    record.description,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete all sensor alerts created strictly before `cutoff` (stored
/// timestamp format). Returns the number of rows removed; deleting rows
/// that are already gone is not an error.
pub async fn delete_older_than(db: &Database, cutoff: &str) -> Result<u64, VigilError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM sensor_alerts WHERE created_at < ?1",
                params![cutoff],
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count the sensor alerts currently stored.
pub async fn count(db: &Database) -> Result<u64, VigilError> {
    db.connection()
        .call(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM sensor_alerts", [], |row| {
                row.get(0)
            })?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List sensor alerts in chronological order, newest last.
pub async fn list(db: &Database) -> Result<Vec<SensorAlertRecord>, VigilError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sensor_id, state, description, created_at
                 FROM sensor_alerts ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(SensorAlertRecord {
                    id: row.get(0)?,
                    sensor_id: row.get(1)?,
                    state: row.get(2)?,
                    description: row.get(3)?,
                    created_at: row.get(4)?,
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
