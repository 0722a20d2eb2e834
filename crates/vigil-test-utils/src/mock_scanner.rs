// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock malware scanner for deterministic testing.
//!
//! `MockScanner` implements `MalwareScanner` with per-skylink outcomes,
//! enabling fast, CI-runnable tests without a clamd daemon or portal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use vigil_core::{ByteStream, MalwareScanner, ScanOutcome, ScanVerdict, VigilError};

/// A mock scanner that returns pre-configured outcomes per skylink.
///
/// Skylinks without a configured outcome get a clean default verdict
/// over 1 MiB of fully scanned content.
pub struct MockScanner {
    portal: String,
    healthy: AtomicBool,
    outcomes: Mutex<HashMap<String, Result<ScanOutcome, String>>>,
    scanned: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl MockScanner {
    /// Creates a healthy mock reporting the given preferred portal.
    pub fn new(portal: impl Into<String>) -> Self {
        Self {
            portal: portal.into(),
            healthy: AtomicBool::new(true),
            outcomes: Mutex::new(HashMap::new()),
            scanned: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    /// Pre-sets the outcome returned for `skylink`.
    pub async fn set_outcome(&self, skylink: impl Into<String>, outcome: ScanOutcome) {
        self.outcomes.lock().await.insert(skylink.into(), Ok(outcome));
    }

    /// Pre-sets a scanner error for `skylink`.
    pub async fn set_error(&self, skylink: impl Into<String>, message: impl Into<String>) {
        self.outcomes
            .lock()
            .await
            .insert(skylink.into(), Err(message.into()));
    }

    /// Makes `ping` fail until restored.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Delays every scan, so abort behavior can be exercised.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    /// The skylinks scanned so far, in order.
    pub async fn scanned(&self) -> Vec<String> {
        self.scanned.lock().await.clone()
    }

    async fn wait_or_abort(&self, abort: &CancellationToken) -> Result<(), VigilError> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::select! {
                _ = abort.cancelled() => {
                    return Err(VigilError::Scanner {
                        message: "scan aborted".into(),
                        source: None,
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MalwareScanner for MockScanner {
    async fn ping(&self) -> Result<(), VigilError> {
        if self.healthy.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(VigilError::Scanner {
                message: "mock scanner marked unhealthy".into(),
                source: None,
            })
        }
    }

    fn preferred_portal(&self) -> &str {
        &self.portal
    }

    async fn scan(
        &self,
        _stream: ByteStream,
        abort: &CancellationToken,
    ) -> Result<ScanVerdict, VigilError> {
        self.wait_or_abort(abort).await?;
        Ok(ScanVerdict {
            infected: false,
            description: String::new(),
        })
    }

    async fn scan_skylink(
        &self,
        skylink: &str,
        abort: &CancellationToken,
    ) -> Result<ScanOutcome, VigilError> {
        self.wait_or_abort(abort).await?;
        self.scanned.lock().await.push(skylink.to_string());

        match self.outcomes.lock().await.get(skylink) {
            Some(Ok(outcome)) => Ok(outcome.clone()),
            Some(Err(message)) => Err(VigilError::Scanner {
                message: message.clone(),
                source: None,
            }),
            None => Ok(ScanOutcome {
                infected: false,
                description: String::new(),
                size: 1 << 20,
                scanned_size: 1 << 20,
            }),
        }
    }
}
