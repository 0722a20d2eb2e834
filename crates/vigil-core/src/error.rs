// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Vigil scanning service.

use thiserror::Error;

/// The primary error type used across all Vigil adapter traits and core operations.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Configuration errors (missing required env vars, invalid TOML, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The submitted identifier failed syntactic validation.
    #[error("invalid skylink: {0}")]
    InvalidSkylink(String),

    /// A version-2 identifier could not be reduced to a canonical hash.
    #[error("unresolvable skylink: {0}")]
    Unresolvable(String),

    /// Store backend errors (connection, query failure, row decoding).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No skylink in the `new` state is available to claim. Benign; drives
    /// the worker's idle sleep rather than its error backoff.
    #[error("no new skylinks in the queue")]
    EmptyQueue,

    /// Scanner errors (clamd connection, stream failure, portal fetch).
    /// The affected record is returned to `new` for a retry.
    #[error("scanner error: {message}")]
    Scanner {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Blocker errors (transport failure or non-200 response). Aborts the
    /// current reporting sweep only.
    #[error("blocker error: {message}")]
    Blocker {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VigilError {
    /// Whether this error is the benign empty-queue sentinel.
    pub fn is_empty_queue(&self) -> bool {
        matches!(self, VigilError::EmptyQueue)
    }
}
