// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reporter: propagates infected verdicts to the blocker service.
//!
//! Each sweep drains the unreported backlog one record at a time; each
//! POST already rate-limits against the blocker so the inner loop needs
//! no sleep of its own. A blocker failure aborts the sweep, never the
//! loop.

use reqwest::StatusCode;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use vigil_core::{ScanStatus, VigilError};

use crate::worker::Scanner;

/// Reporter identity sent with every block request.
const REPORTER_NAME: &str = "Malware Scanner";

/// Tag marking the skylink as blocked by the scanner rather than by a
/// user report.
const MALWARE_TAG: &str = "malware-scanner";

#[derive(Debug, Serialize)]
struct BlockRequest<'a> {
    skylink: &'a str,
    reporter: Reporter<'a>,
    tags: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct Reporter<'a> {
    name: &'a str,
}

/// HTTP client for the blocker service.
#[derive(Debug, Clone)]
pub struct BlockerClient {
    client: reqwest::Client,
    base_url: String,
}

impl BlockerClient {
    /// Creates a client for the blocker at `base_url`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Instructs the blocker to take down the given skylink as malware.
    pub async fn block(&self, skylink: &str) -> Result<(), VigilError> {
        let body = BlockRequest {
            skylink,
            reporter: Reporter {
                name: REPORTER_NAME,
            },
            tags: [MALWARE_TAG],
        };
        let response = self
            .client
            .post(format!("{}/block", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| VigilError::Blocker {
                message: "failed to call blocker".into(),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(VigilError::Blocker {
                message: format!("blocker failed. status code {status}, body: '{body}'"),
                source: None,
            });
        }
        Ok(())
    }
}

impl Scanner {
    /// Sweeps the store for infected skylinks that have not been reported
    /// yet and posts them to the blocker.
    ///
    /// Returns the number of skylinks blocked, together with the error
    /// that aborted the sweep, if any.
    pub async fn sweep_and_block(&self) -> (usize, Option<VigilError>) {
        let mut count = 0;
        loop {
            let mut record = match self.store().find_one_unreported().await {
                Ok(Some(record)) => record,
                Ok(None) => return (count, None),
                Err(e) => return (count, Some(e)),
            };

            info!(
                skylink = %record.skylink,
                description = %record.infection_description,
                "reporting malicious skylink"
            );
            if let Err(e) = self.blocker().block(&record.skylink).await {
                return (count, Some(e));
            }

            // Mark the record reported and drop the skylink itself so the
            // store keeps no usable pointer at harmful content.
            record.skylink = String::new();
            record.status = ScanStatus::Complete;
            record.timestamp = chrono::Utc::now();
            if let Err(e) = self.store().save(&record).await {
                return (count, Some(e));
            }
            count += 1;
        }
    }

    /// Runs the reporting loop until `cancel` fires.
    pub async fn run_report_loop(&self, cancel: CancellationToken) {
        let mut first = true;
        loop {
            if !first {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("report loop shutting down");
                        return;
                    }
                    _ = tokio::time::sleep(self.config().sleep_between_reports()) => {}
                }
            }
            first = false;

            match self.sweep_and_block().await {
                (blocked, None) => trace!(blocked, "reporting sweep complete"),
                (blocked, Some(e)) => {
                    warn!(blocked, error = %e, "reporting sweep aborted early")
                }
            }

            if cancel.is_cancelled() {
                info!("report loop shutting down");
                return;
            }
        }
    }
}
