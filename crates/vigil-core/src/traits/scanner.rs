// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scanner trait for the external virus-scanning daemon.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::VigilError;
use crate::types::{ScanOutcome, ScanVerdict};

/// A boxed stream of content chunks fed to the scanner.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Client interface to the external malware-scanning daemon.
///
/// The `abort` token cuts an in-flight stream promptly; it is shared with
/// the process-wide shutdown signal so a long scan never delays exit.
#[async_trait]
pub trait MalwareScanner: Send + Sync {
    /// Checks the scanning daemon's liveness.
    async fn ping(&self) -> Result<(), VigilError>;

    /// The portal this scanner downloads content from.
    fn preferred_portal(&self) -> &str;

    /// Streams raw content to the daemon and returns its verdict.
    async fn scan(
        &self,
        stream: ByteStream,
        abort: &CancellationToken,
    ) -> Result<ScanVerdict, VigilError>;

    /// Downloads the content behind `skylink` from the preferred portal
    /// and streams it to the daemon, reporting the portal's content
    /// length and the number of bytes actually scanned.
    async fn scan_skylink(
        &self,
        skylink: &str,
        abort: &CancellationToken,
    ) -> Result<ScanOutcome, VigilError>;
}
