// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait for the durable skylink queue.
//!
//! The worker loops depend only on this trait, which keeps store-specific
//! query objects out of the scheduling layer and lets tests substitute an
//! in-memory implementation.

use async_trait::async_trait;

use crate::error::VigilError;
use crate::types::{Hash, ScanRecord};

/// Durable, indexed collection of [`ScanRecord`]s with atomic claim/save
/// primitives.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Inserts a record. A duplicate-hash violation is silently ignored
    /// and reported as success.
    async fn insert(&self, record: &ScanRecord) -> Result<(), VigilError>;

    /// Fetches the record with the given content hash, if any.
    async fn find_by_hash(&self, hash: &Hash) -> Result<Option<ScanRecord>, VigilError>;

    /// Fetches the record with the given store-assigned id, if any.
    async fn find_by_id(&self, id: i64) -> Result<Option<ScanRecord>, VigilError>;

    /// Persists the record's current state, keyed by its id.
    async fn save(&self, record: &ScanRecord) -> Result<(), VigilError>;

    /// Atomically picks exactly one record in the `new` state, marks it
    /// `scanning` with a fresh timestamp and returns it. Two concurrent
    /// callers never receive the same record.
    ///
    /// Fails with [`VigilError::EmptyQueue`] when nothing is claimable.
    async fn claim_one(&self) -> Result<ScanRecord, VigilError>;

    /// Returns a single infected, unreported record whose skylink has not
    /// yet been cleared, or `None` when the backlog is drained.
    async fn find_one_unreported(&self) -> Result<Option<ScanRecord>, VigilError>;

    /// Returns every record stuck in `scanning` longer than the scan
    /// timeout to the `new` state with a fresh timestamp. Returns the
    /// number of records reset.
    async fn reset_stuck(&self) -> Result<u64, VigilError>;

    /// Connectivity probe with a bounded internal timeout.
    async fn ping(&self) -> Result<(), VigilError>;
}
