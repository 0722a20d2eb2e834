// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postgres implementation of the ScanStore trait.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use vigil_core::{Hash, ScanRecord, ScanStore, VigilError};

use crate::database::Database;
use crate::queries;

/// Postgres-backed skylink queue.
///
/// Holds the connection pool and the scan timeout the reaper sweep uses
/// to decide when a lease has expired.
pub struct PgStore {
    db: Database,
    scan_timeout: Duration,
}

impl PgStore {
    /// Connects to the store, ensures the schema and returns the adapter.
    pub async fn connect(
        connection_string: &str,
        scan_timeout: Duration,
    ) -> Result<Self, VigilError> {
        let db = Database::connect(connection_string).await?;
        debug!(scan_timeout_secs = scan_timeout.as_secs(), "store connected");
        Ok(Self { db, scan_timeout })
    }
}

#[async_trait]
impl ScanStore for PgStore {
    async fn insert(&self, record: &ScanRecord) -> Result<(), VigilError> {
        queries::scan_records::insert(&self.db, record).await
    }

    async fn find_by_hash(&self, hash: &Hash) -> Result<Option<ScanRecord>, VigilError> {
        queries::scan_records::find_by_hash(&self.db, hash).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ScanRecord>, VigilError> {
        queries::scan_records::find_by_id(&self.db, id).await
    }

    async fn save(&self, record: &ScanRecord) -> Result<(), VigilError> {
        queries::scan_records::save(&self.db, record).await
    }

    async fn claim_one(&self) -> Result<ScanRecord, VigilError> {
        queries::scan_records::claim_one(&self.db).await
    }

    async fn find_one_unreported(&self) -> Result<Option<ScanRecord>, VigilError> {
        queries::scan_records::find_one_unreported(&self.db).await
    }

    async fn reset_stuck(&self) -> Result<u64, VigilError> {
        queries::scan_records::reset_stuck(&self.db, self.scan_timeout).await
    }

    async fn ping(&self) -> Result<(), VigilError> {
        self.db.ping().await
    }
}
