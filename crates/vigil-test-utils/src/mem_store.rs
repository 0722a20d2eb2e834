// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ScanStore for deterministic tests.
//!
//! A single mutex stands in for the real store's row-level locking, which
//! preserves the claim primitive's atomicity guarantee: concurrent
//! claimers serialize on the lock and can never receive the same record.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use vigil_core::{Hash, ScanRecord, ScanStatus, ScanStore, VigilError};

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: Vec<ScanRecord>,
}

/// Mutex-guarded in-memory skylink queue.
pub struct MemStore {
    inner: Mutex<Inner>,
    scan_timeout: Duration,
}

impl MemStore {
    /// Creates an empty store with the production scan timeout.
    pub fn new() -> Self {
        Self::with_scan_timeout(Duration::from_secs(3600))
    }

    /// Creates an empty store with a custom scan timeout, so reaper tests
    /// need not manufacture hour-old timestamps.
    pub fn with_scan_timeout(scan_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            scan_timeout,
        }
    }

    /// Snapshot of every record, for assertions.
    pub async fn dump(&self) -> Vec<ScanRecord> {
        self.inner.lock().await.records.clone()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScanStore for MemStore {
    async fn insert(&self, record: &ScanRecord) -> Result<(), VigilError> {
        let mut inner = self.inner.lock().await;
        if inner.records.iter().any(|r| r.hash == record.hash) {
            // Duplicate hash: silent no-op, same as the unique index.
            return Ok(());
        }
        inner.next_id += 1;
        let mut stored = record.clone();
        stored.id = Some(inner.next_id);
        inner.records.push(stored);
        Ok(())
    }

    async fn find_by_hash(&self, hash: &Hash) -> Result<Option<ScanRecord>, VigilError> {
        let inner = self.inner.lock().await;
        Ok(inner.records.iter().find(|r| &r.hash == hash).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ScanRecord>, VigilError> {
        let inner = self.inner.lock().await;
        Ok(inner.records.iter().find(|r| r.id == Some(id)).cloned())
    }

    async fn save(&self, record: &ScanRecord) -> Result<(), VigilError> {
        let id = record
            .id
            .ok_or_else(|| VigilError::Internal("cannot save a record without an id".into()))?;
        let mut inner = self.inner.lock().await;
        match inner.records.iter_mut().find(|r| r.id == Some(id)) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(VigilError::Internal(format!("no record with id {id}"))),
        }
    }

    async fn claim_one(&self) -> Result<ScanRecord, VigilError> {
        let mut inner = self.inner.lock().await;
        let candidate = inner
            .records
            .iter_mut()
            .filter(|r| r.status == ScanStatus::New)
            .min_by_key(|r| r.timestamp);
        match candidate {
            Some(record) => {
                record.status = ScanStatus::Scanning;
                record.timestamp = Utc::now();
                Ok(record.clone())
            }
            None => Err(VigilError::EmptyQueue),
        }
    }

    async fn find_one_unreported(&self) -> Result<Option<ScanRecord>, VigilError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .records
            .iter()
            .find(|r| r.status == ScanStatus::Unreported && r.infected && !r.skylink.is_empty())
            .cloned())
    }

    async fn reset_stuck(&self) -> Result<u64, VigilError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.scan_timeout)
                .map_err(|e| VigilError::Internal(format!("scan timeout out of range: {e}")))?;
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        for record in inner
            .records
            .iter_mut()
            .filter(|r| r.status == ScanStatus::Scanning && r.timestamp < cutoff)
        {
            record.status = ScanStatus::New;
            record.timestamp = Utc::now();
            count += 1;
        }
        Ok(count)
    }

    async fn ping(&self) -> Result<(), VigilError> {
        Ok(())
    }
}
