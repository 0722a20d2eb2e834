// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ClamAV scanner adapter.
//!
//! Implements [`MalwareScanner`] on top of the clamd protocol client:
//! the skylink form downloads content from the preferred portal and
//! streams it through the daemon while counting how many bytes were
//! actually read, so a truncated scan can be recorded as partial.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use tokio_util::sync::CancellationToken;

use vigil_core::{ByteStream, MalwareScanner, ScanOutcome, ScanVerdict, VigilError};

use crate::clamd::Clamd;

/// Client for the external ClamAV daemon.
#[derive(Debug)]
pub struct ClamAv {
    clamd: Clamd,
    portal: String,
    client: reqwest::Client,
}

impl ClamAv {
    /// Creates a client for the daemon at `addr` and verifies the
    /// connection with a PING before returning it.
    pub async fn connect(addr: String, portal: String) -> Result<Self, VigilError> {
        let clam = Self {
            clamd: Clamd::new(addr),
            portal,
            client: reqwest::Client::new(),
        };
        clam.ping().await?;
        Ok(clam)
    }

    /// Creates a client without the connection check. Used by tests that
    /// bring the daemon up after construction.
    pub fn new_unchecked(addr: String, portal: String) -> Self {
        Self {
            clamd: Clamd::new(addr),
            portal,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MalwareScanner for ClamAv {
    async fn ping(&self) -> Result<(), VigilError> {
        self.clamd.ping().await
    }

    fn preferred_portal(&self) -> &str {
        &self.portal
    }

    async fn scan(
        &self,
        stream: ByteStream,
        abort: &CancellationToken,
    ) -> Result<ScanVerdict, VigilError> {
        self.clamd.scan_stream(stream, abort).await
    }

    async fn scan_skylink(
        &self,
        skylink: &str,
        abort: &CancellationToken,
    ) -> Result<ScanOutcome, VigilError> {
        let url = format!("{}/{skylink}", self.portal);
        let response = self.client.get(&url).send().await.map_err(|e| {
            VigilError::Scanner {
                message: format!("portal download of {skylink} failed"),
                source: Some(Box::new(e)),
            }
        })?;
        let size = parse_content_length(response.headers())?;

        // Count the bytes handed to the daemon. If the stream is cut
        // short the difference between size and this counter records how
        // much content went unscanned.
        let counter = Arc::new(AtomicU64::new(0));
        let read_bytes = counter.clone();
        let counted: ByteStream = Box::pin(response.bytes_stream().map(move |chunk| {
            match chunk {
                Ok(bytes) => {
                    read_bytes.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                    Ok(bytes)
                }
                Err(e) => Err(std::io::Error::other(e)),
            }
        }));

        let verdict = self.scan(counted, abort).await?;
        Ok(ScanOutcome {
            infected: verdict.infected,
            description: verdict.description,
            size,
            scanned_size: counter.load(Ordering::Relaxed),
        })
    }
}

/// Extracts the content length the portal reported. An absent or
/// unparsable header is fatal for this scan.
fn parse_content_length(headers: &reqwest::header::HeaderMap) -> Result<u64, VigilError> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| VigilError::Scanner {
            message: "failed parsing content-length".into(),
            source: None,
        })
}
