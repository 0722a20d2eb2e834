// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed queries over the `skylinks` table.
//!
//! `claim_one` is the single synchronization point of the whole service:
//! the `FOR UPDATE SKIP LOCKED` sub-select makes the new-to-scanning
//! transition a store-level compare-and-swap, so concurrent workers can
//! never claim the same record.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;

use vigil_core::{Hash, ScanRecord, ScanStatus, VigilError};

use crate::database::{map_sqlx_err, Database};

const RECORD_COLUMNS: &str = "id, hash, skylink, status, infected, infection_description, \
     size, scanned_size, scanned_all_content, scanned_all_offsets, timestamp";

/// Inserts a record. A duplicate hash is a silent no-op.
pub async fn insert(db: &Database, record: &ScanRecord) -> Result<(), VigilError> {
    sqlx::query(
        "INSERT INTO skylinks (hash, skylink, status, infected, infection_description, \
         size, scanned_size, scanned_all_content, scanned_all_offsets, timestamp) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (hash) DO NOTHING",
    )
    .bind(record.hash.as_bytes().to_vec())
    .bind(&record.skylink)
    .bind(record.status.to_string())
    .bind(record.infected)
    .bind(&record.infection_description)
    .bind(record.size as i64)
    .bind(record.scanned_size as i64)
    .bind(record.scanned_all_content)
    .bind(record.scanned_all_offsets)
    .bind(record.timestamp)
    .execute(db.pool())
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

/// Fetches the record with the given content hash.
pub async fn find_by_hash(db: &Database, hash: &Hash) -> Result<Option<ScanRecord>, VigilError> {
    let row = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM skylinks WHERE hash = $1"
    ))
    .bind(hash.as_bytes().to_vec())
    .fetch_optional(db.pool())
    .await
    .map_err(map_sqlx_err)?;
    row.map(|r| record_from_row(&r)).transpose()
}

/// Fetches the record with the given store-assigned id.
pub async fn find_by_id(db: &Database, id: i64) -> Result<Option<ScanRecord>, VigilError> {
    let row = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM skylinks WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db.pool())
    .await
    .map_err(map_sqlx_err)?;
    row.map(|r| record_from_row(&r)).transpose()
}

/// Persists a record's mutable fields, keyed by id. The hash is never
/// rewritten.
pub async fn save(db: &Database, record: &ScanRecord) -> Result<(), VigilError> {
    let id = record.id.ok_or_else(|| {
        VigilError::Internal("cannot save a record the store never assigned an id".into())
    })?;
    sqlx::query(
        "UPDATE skylinks SET skylink = $2, status = $3, infected = $4, \
         infection_description = $5, size = $6, scanned_size = $7, \
         scanned_all_content = $8, scanned_all_offsets = $9, timestamp = $10 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&record.skylink)
    .bind(record.status.to_string())
    .bind(record.infected)
    .bind(&record.infection_description)
    .bind(record.size as i64)
    .bind(record.scanned_size as i64)
    .bind(record.scanned_all_content)
    .bind(record.scanned_all_offsets)
    .bind(record.timestamp)
    .execute(db.pool())
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

/// Atomically claims one `new` record for scanning.
pub async fn claim_one(db: &Database) -> Result<ScanRecord, VigilError> {
    let row = sqlx::query(&format!(
        "UPDATE skylinks SET status = $1, timestamp = now() \
         WHERE id = ( \
             SELECT id FROM skylinks WHERE status = $2 \
             ORDER BY timestamp ASC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED \
         ) \
         RETURNING {RECORD_COLUMNS}"
    ))
    .bind(ScanStatus::Scanning.to_string())
    .bind(ScanStatus::New.to_string())
    .fetch_optional(db.pool())
    .await
    .map_err(map_sqlx_err)?;

    match row {
        Some(r) => record_from_row(&r),
        None => Err(VigilError::EmptyQueue),
    }
}

/// Returns one infected record whose verdict has not been propagated.
pub async fn find_one_unreported(db: &Database) -> Result<Option<ScanRecord>, VigilError> {
    let row = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM skylinks \
         WHERE status = $1 AND infected AND skylink <> '' \
         LIMIT 1"
    ))
    .bind(ScanStatus::Unreported.to_string())
    .fetch_optional(db.pool())
    .await
    .map_err(map_sqlx_err)?;
    row.map(|r| record_from_row(&r)).transpose()
}

/// Returns leases older than `timeout` to the `new` state.
pub async fn reset_stuck(db: &Database, timeout: Duration) -> Result<u64, VigilError> {
    let result = sqlx::query(
        "UPDATE skylinks SET status = $1, timestamp = now() \
         WHERE status = $2 AND timestamp < now() - make_interval(secs => $3)",
    )
    .bind(ScanStatus::New.to_string())
    .bind(ScanStatus::Scanning.to_string())
    .bind(timeout.as_secs_f64())
    .execute(db.pool())
    .await
    .map_err(map_sqlx_err)?;
    Ok(result.rows_affected())
}

/// Decodes one `skylinks` row.
fn record_from_row(row: &PgRow) -> Result<ScanRecord, VigilError> {
    let hash_bytes: Vec<u8> = row.try_get("hash").map_err(map_sqlx_err)?;
    let status_str: String = row.try_get("status").map_err(map_sqlx_err)?;
    let status = ScanStatus::from_str(&status_str)
        .map_err(|_| VigilError::Internal(format!("unknown status '{status_str}' in store")))?;
    let timestamp: DateTime<Utc> = row.try_get("timestamp").map_err(map_sqlx_err)?;

    Ok(ScanRecord {
        id: Some(row.try_get::<i64, _>("id").map_err(map_sqlx_err)?),
        hash: Hash::try_from(hash_bytes.as_slice())?,
        skylink: row.try_get("skylink").map_err(map_sqlx_err)?,
        status,
        infected: row.try_get("infected").map_err(map_sqlx_err)?,
        infection_description: row
            .try_get("infection_description")
            .map_err(map_sqlx_err)?,
        size: row.try_get::<i64, _>("size").map_err(map_sqlx_err)? as u64,
        scanned_size: row.try_get::<i64, _>("scanned_size").map_err(map_sqlx_err)? as u64,
        scanned_all_content: row.try_get("scanned_all_content").map_err(map_sqlx_err)?,
        scanned_all_offsets: row.try_get("scanned_all_offsets").map_err(map_sqlx_err)?,
        timestamp,
    })
}
