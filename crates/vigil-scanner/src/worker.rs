// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scan worker: claims queued skylinks one at a time, streams them
//! through the external scanner and persists the verdict.
//!
//! The loop is strictly single-flight, so at most one outbound stream to
//! the scanner is in flight per process. Scheduling is adaptive: no sleep
//! after a successful scan, the configured idle sleep when the queue is
//! empty, and an exponential backoff after errors.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use vigil_config::model::WorkerConfig;
use vigil_core::{MalwareScanner, ScanStatus, ScanStore, VigilError};

use crate::reporter::BlockerClient;

/// Base sleep after the first consecutive error.
const SLEEP_ON_ERR_STEP: Duration = Duration::from_millis(100);

/// Maximum number of times the error sleep is lengthened. Together with
/// the base step this caps the backoff at 100 seconds.
const SLEEP_ON_ERR_STEPS: u32 = 3;

/// Sleep before the next sweep after `err_streak` consecutive errors.
pub(crate) fn error_backoff(err_streak: u32) -> Duration {
    SLEEP_ON_ERR_STEP * 10u32.pow(err_streak.min(SLEEP_ON_ERR_STEPS))
}

/// Drives scanning of queued skylinks against the external scanner.
pub struct Scanner {
    store: Arc<dyn ScanStore>,
    clam: Arc<dyn MalwareScanner>,
    blocker: BlockerClient,
    config: WorkerConfig,
}

impl Scanner {
    /// Creates a scanner over the given store and scanner client.
    /// `blocker_url` is the blocker service base URL.
    pub fn new(
        store: Arc<dyn ScanStore>,
        clam: Arc<dyn MalwareScanner>,
        blocker_url: String,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            clam,
            blocker: BlockerClient::new(blocker_url),
            config,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn ScanStore> {
        &self.store
    }

    pub(crate) fn blocker(&self) -> &BlockerClient {
        &self.blocker
    }

    pub(crate) fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Claims one queued skylink, scans it and persists the verdict.
    ///
    /// Returns [`VigilError::EmptyQueue`] when nothing is claimable; any
    /// other error feeds the caller's backoff schedule.
    pub async fn sweep_and_scan(&self, abort: &CancellationToken) -> Result<(), VigilError> {
        let mut record = match self.store.claim_one().await {
            Ok(record) => record,
            Err(VigilError::EmptyQueue) => return Err(VigilError::EmptyQueue),
            Err(e) => {
                warn!(error = %e, "error while trying to claim a new record");
                return Err(e);
            }
        };
        if record.skylink.is_empty() {
            // A record like this can never be scanned; the reaper will
            // eventually recycle it, but it should not exist at all.
            error!(hash = %record.hash, "claimed a record with an empty skylink");
            return Err(VigilError::Internal("empty skylink".into()));
        }

        let outcome = match self.clam.scan_skylink(&record.skylink, abort).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Scanning failed; unlock the record for another attempt.
                // The fresh timestamp restarts its reaper window.
                debug!(skylink = %record.skylink, error = %e, "scanning failed");
                record.status = ScanStatus::New;
                record.timestamp = Utc::now();
                if let Err(save_err) = self.store.save(&record).await {
                    debug!(error = %save_err, "unlocking a skylink failed");
                }
                return Err(e);
            }
        };

        if outcome.scanned_size > outcome.size {
            warn!(
                skylink = %record.skylink,
                scanned_size = outcome.scanned_size,
                size = outcome.size,
                "scanned more bytes than the reported content size"
            );
        }

        if outcome.infected {
            info!(
                skylink = %record.skylink,
                description = %outcome.description,
                "skylink is infected"
            );
            record.status = ScanStatus::Unreported;
        } else {
            // Clean content needs no reporting, so the skylink itself can
            // be dropped right away.
            record.skylink = String::new();
            record.status = ScanStatus::Complete;
        }
        record.infected = outcome.infected;
        record.infection_description = outcome.description;
        record.size = outcome.size;
        record.scanned_size = outcome.scanned_size;
        record.scanned_all_content = outcome.scanned_size == outcome.size;
        record.scanned_all_offsets = false;
        record.timestamp = Utc::now();
        self.store.save(&record).await
    }

    /// Runs the scan loop until `cancel` fires.
    ///
    /// `cancel` doubles as the abort signal for the in-flight scanner
    /// stream, so shutdown preempts even a long-running scan.
    pub async fn run_scan_loop(&self, cancel: CancellationToken) {
        let mut sleep_length = self.config.sleep_between_scans();
        let mut err_streak: u32 = 0;
        let mut first = true;

        loop {
            if !first {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("scan loop shutting down");
                        return;
                    }
                    _ = tokio::time::sleep(sleep_length) => {}
                }
            }
            first = false;

            match self.sweep_and_scan(&cancel).await {
                Ok(()) => {
                    // Keep draining while there is work.
                    sleep_length = Duration::ZERO;
                    err_streak = 0;
                }
                Err(VigilError::EmptyQueue) => {
                    sleep_length = self.config.sleep_between_scans();
                    err_streak = 0;
                }
                Err(e) => {
                    debug!(error = %e, "sweep failed");
                    sleep_length = error_backoff(err_streak);
                    err_streak = (err_streak + 1).min(SLEEP_ON_ERR_STEPS);
                }
            }

            if cancel.is_cancelled() {
                info!("scan loop shutting down");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{Hash, ScanOutcome, ScanRecord};
    use vigil_test_utils::{MemStore, MockScanner};

    fn scanner_over(store: Arc<MemStore>, clam: Arc<MockScanner>) -> Scanner {
        let config = WorkerConfig {
            sleep_between_scans_ms: 10,
            sleep_between_reports_ms: 10,
            scan_timeout_ms: 3_600_000,
        };
        Scanner::new(store, clam, "http://127.0.0.1:1".into(), config)
    }

    fn queued(seed: u8) -> ScanRecord {
        ScanRecord::new(format!("skylink-{seed}"), Hash([seed; 32]))
    }

    #[tokio::test]
    async fn empty_queue_is_reported_as_idle() {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        let scanner = scanner_over(store, clam);

        let err = scanner
            .sweep_and_scan(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_empty_queue());
    }

    #[tokio::test]
    async fn clean_scan_completes_the_record_and_clears_the_skylink() {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        store.insert(&queued(1)).await.unwrap();
        clam.set_outcome(
            "skylink-1",
            ScanOutcome {
                infected: false,
                description: String::new(),
                size: 1024,
                scanned_size: 1024,
            },
        )
        .await;
        let scanner = scanner_over(store.clone(), clam);

        scanner
            .sweep_and_scan(&CancellationToken::new())
            .await
            .unwrap();

        let record = store.find_by_hash(&Hash([1; 32])).await.unwrap().unwrap();
        assert_eq!(record.status, ScanStatus::Complete);
        assert_eq!(record.skylink, "");
        assert!(!record.infected);
        assert_eq!(record.size, 1024);
        assert!(record.scanned_all_content);
        assert!(!record.scanned_all_offsets);
    }

    #[tokio::test]
    async fn infected_scan_retains_the_skylink_for_the_reporter() {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        store.insert(&queued(2)).await.unwrap();
        clam.set_outcome(
            "skylink-2",
            ScanOutcome {
                infected: true,
                description: "Eicar-Test-Signature".into(),
                size: 68,
                scanned_size: 68,
            },
        )
        .await;
        let scanner = scanner_over(store.clone(), clam);

        scanner
            .sweep_and_scan(&CancellationToken::new())
            .await
            .unwrap();

        let record = store.find_by_hash(&Hash([2; 32])).await.unwrap().unwrap();
        assert_eq!(record.status, ScanStatus::Unreported);
        assert_eq!(record.skylink, "skylink-2", "the reporter still needs it");
        assert!(record.infected);
        assert_eq!(record.infection_description, "Eicar-Test-Signature");
    }

    #[tokio::test]
    async fn scanner_error_returns_the_record_to_new_with_a_fresh_lease() {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        store.insert(&queued(3)).await.unwrap();
        let queued_at = store.find_by_hash(&Hash([3; 32])).await.unwrap().unwrap().timestamp;
        clam.set_error("skylink-3", "clamd hung up").await;
        let scanner = scanner_over(store.clone(), clam);

        let err = scanner
            .sweep_and_scan(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::Scanner { .. }));

        let record = store.find_by_hash(&Hash([3; 32])).await.unwrap().unwrap();
        assert_eq!(record.status, ScanStatus::New, "ready for a retry");
        assert_eq!(record.skylink, "skylink-3", "the skylink is kept");
        assert!(record.timestamp >= queued_at, "the lease window restarts");
    }

    #[tokio::test]
    async fn partial_scan_records_incomplete_coverage() {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        store.insert(&queued(4)).await.unwrap();
        clam.set_outcome(
            "skylink-4",
            ScanOutcome {
                infected: false,
                description: String::new(),
                size: 1 << 30,
                scanned_size: 1 << 20,
            },
        )
        .await;
        let scanner = scanner_over(store.clone(), clam);

        scanner
            .sweep_and_scan(&CancellationToken::new())
            .await
            .unwrap();

        let record = store.find_by_hash(&Hash([4; 32])).await.unwrap().unwrap();
        assert!(!record.scanned_all_content);
        assert_eq!(record.scanned_size, 1 << 20);
    }

    #[tokio::test]
    async fn empty_skylink_record_is_rejected_without_scanning() {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        store
            .insert(&ScanRecord::new(String::new(), Hash([5; 32])))
            .await
            .unwrap();
        let scanner = scanner_over(store.clone(), clam.clone());

        let err = scanner
            .sweep_and_scan(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::Internal(_)));
        assert!(clam.scanned().await.is_empty(), "nothing reached the scanner");

        // The claim stands; the reaper recycles it eventually.
        let record = store.find_by_hash(&Hash([5; 32])).await.unwrap().unwrap();
        assert_eq!(record.status, ScanStatus::Scanning);
    }

    #[test]
    fn backoff_grows_by_an_order_of_magnitude_and_caps() {
        assert_eq!(error_backoff(0), Duration::from_millis(100));
        assert_eq!(error_backoff(1), Duration::from_secs(1));
        assert_eq!(error_backoff(2), Duration::from_secs(10));
        assert_eq!(error_backoff(3), Duration::from_secs(100));
        assert_eq!(error_backoff(7), Duration::from_secs(100), "capped");
    }

    #[tokio::test]
    async fn scan_loop_drains_the_queue_and_stops_on_cancel() {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        for seed in 10..13u8 {
            store.insert(&queued(seed)).await.unwrap();
        }
        let scanner = Arc::new(scanner_over(store.clone(), clam.clone()));

        let cancel = CancellationToken::new();
        let loop_handle = {
            let scanner = scanner.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scanner.run_scan_loop(cancel).await })
        };

        // All three records get verdicts without waiting for idle sleeps.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if clam.scanned().await.len() == 3 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queue should drain");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), loop_handle)
            .await
            .expect("loop should exit on cancel")
            .unwrap();

        for record in store.dump().await {
            assert_eq!(record.status, ScanStatus::Complete);
        }
    }

    #[tokio::test]
    async fn abort_interrupts_a_slow_scan() {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        store.insert(&queued(20)).await.unwrap();
        clam.set_delay(Duration::from_secs(30)).await;
        let scanner = Arc::new(scanner_over(store.clone(), clam));

        let cancel = CancellationToken::new();
        let sweep = {
            let scanner = scanner.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scanner.sweep_and_scan(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), sweep)
            .await
            .expect("abort should preempt the scan")
            .unwrap();
        assert!(matches!(result, Err(VigilError::Scanner { .. })));
    }
}
