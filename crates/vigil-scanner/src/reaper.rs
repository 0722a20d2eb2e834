// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reaper: releases leases whose scan has overrun the timeout.
//!
//! A claim carries no heartbeat; the only lease signal is the timestamp
//! written by `claim_one`. The reaper ticks at the scan-timeout interval,
//! so a crashed scan is back in the queue after at most two timeout
//! periods. Scans are idempotent on restart, which makes that bound safe.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::worker::Scanner;

impl Scanner {
    /// Runs the reaper loop until `cancel` fires.
    pub async fn run_reaper_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config().scan_timeout());
        // Skip the immediate first tick; a freshly started service has no
        // leases old enough to reap.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reaper shutting down");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.store().reset_stuck().await {
                Ok(count) => trace!(count, "cancelled stuck scans"),
                Err(e) => debug!(error = %e, "error while trying to cancel stuck scans"),
            }
        }
    }
}
