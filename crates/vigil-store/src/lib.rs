// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postgres persistence layer for the Vigil scanning queue.
//!
//! Provides a pooled connection with idempotent schema bootstrap and the
//! atomic claim primitive the scan worker leases records through.

pub mod adapter;
pub mod database;
pub mod queries;

pub use adapter::PgStore;
pub use database::Database;
