// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management and schema bootstrap.
//!
//! Connects a bounded `PgPool` and creates the `skylinks` table and its
//! indexes if absent. The unique index on `hash` is what turns duplicate
//! submissions into no-ops, and `claim_one`'s `FOR UPDATE SKIP LOCKED`
//! relies on row-level locks, so all writes must go through this pool.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use vigil_core::VigilError;

/// Bounded ping timeout; the health probe must never hang.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Table and index definitions, applied idempotently on startup.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS skylinks (
        id                    BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        hash                  BYTEA NOT NULL,
        skylink               TEXT NOT NULL DEFAULT '',
        status                TEXT NOT NULL DEFAULT 'new',
        infected              BOOLEAN NOT NULL DEFAULT FALSE,
        infection_description TEXT NOT NULL DEFAULT '',
        size                  BIGINT NOT NULL DEFAULT 0,
        scanned_size          BIGINT NOT NULL DEFAULT 0,
        scanned_all_content   BOOLEAN NOT NULL DEFAULT FALSE,
        scanned_all_offsets   BOOLEAN NOT NULL DEFAULT FALSE,
        timestamp             TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS skylinks_hash_unique ON skylinks (hash)",
    "CREATE INDEX IF NOT EXISTS skylinks_status ON skylinks (status)",
    "CREATE INDEX IF NOT EXISTS skylinks_timestamp ON skylinks (timestamp)",
];

/// A connected store database with its schema ensured.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connects to the store and ensures the schema exists.
    ///
    /// A failure here is fatal at startup.
    pub async fn connect(connection_string: &str) -> Result<Self, VigilError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(30))
            .connect(connection_string)
            .await
            .map_err(map_sqlx_err)?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Returns the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `skylinks` table and its indexes if absent.
    async fn ensure_schema(&self) -> Result<(), VigilError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        }
        debug!("store schema ensured");
        Ok(())
    }

    /// Connectivity probe with a bounded internal timeout.
    pub async fn ping(&self) -> Result<(), VigilError> {
        let probe = sqlx::query("SELECT 1").execute(&self.pool);
        match tokio::time::timeout(PING_TIMEOUT, probe).await {
            Ok(result) => result.map(|_| ()).map_err(map_sqlx_err),
            Err(_) => Err(VigilError::Store {
                source: format!("ping timed out after {PING_TIMEOUT:?}").into(),
            }),
        }
    }
}

/// Wraps a sqlx error into the store error variant.
pub(crate) fn map_sqlx_err(e: sqlx::Error) -> VigilError {
    VigilError::Store {
        source: Box::new(e),
    }
}
