// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete scanning pipeline.
//!
//! Each test wires the real ingress handlers and worker loops over the
//! in-memory store, the mock scanner and a wiremock blocker, so the full
//! enqueue -> claim -> verdict -> report flow runs without external
//! services. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use tokio_util::sync::CancellationToken;

use vigil_config::model::WorkerConfig;
use vigil_core::{Hash, ScanOutcome, ScanStatus, ScanStore};
use vigil_gateway::{handlers, GatewayState};
use vigil_scanner::Scanner;
use vigil_skylink::SkylinkResolver;
use vigil_test_utils::{MemStore, MockScanner};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const V1_LINK: &str = "CAD07c3_6RCANw-IgdddeRhxgibS3hZdWxQvKh2gViKPVw";
const V1_HASH: &str = "82a925be13a9d970a4bda34ed67c8e5be179a499e39895b15ff081d62a317ec8";

struct Harness {
    store: Arc<MemStore>,
    clam: Arc<MockScanner>,
    state: GatewayState,
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl Harness {
    /// Builds the full pipeline with test-profile sleeps and spawns all
    /// three worker loops.
    fn start(blocker_url: String) -> Self {
        let store = Arc::new(MemStore::new());
        let clam = Arc::new(MockScanner::new("https://portal.test"));
        let config = WorkerConfig {
            sleep_between_scans_ms: 100,
            sleep_between_reports_ms: 100,
            scan_timeout_ms: 3_600_000,
        };
        let scanner = Arc::new(Scanner::new(
            store.clone(),
            clam.clone(),
            blocker_url,
            config,
        ));
        let state = GatewayState {
            store: store.clone(),
            scanner: clam.clone(),
            resolver: SkylinkResolver::new("http://127.0.0.1:1".into()),
        };

        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();
        for loop_index in 0..3 {
            let scanner = scanner.clone();
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                match loop_index {
                    0 => scanner.run_scan_loop(cancel).await,
                    1 => scanner.run_report_loop(cancel).await,
                    _ => scanner.run_reaper_loop(cancel).await,
                }
            }));
        }

        Self {
            store,
            clam,
            state,
            cancel,
            tasks,
        }
    }

    async fn submit(&self, skylink: &str) -> axum::response::Response {
        handlers::scan_post(State(self.state.clone()), Path(skylink.to_string())).await
    }

    async fn wait_for_status(&self, hash: &Hash, status: ScanStatus) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(record) = self.store.find_by_hash(hash).await.unwrap() {
                    if record.status == status {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("record never reached {status}"));
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            tokio::time::timeout(Duration::from_secs(2), task)
                .await
                .expect("worker loop should exit on cancel")
                .unwrap();
        }
    }
}

#[tokio::test]
async fn clean_content_flows_to_complete() {
    let blocker = MockServer::start().await;
    let harness = Harness::start(blocker.uri());
    harness
        .clam
        .set_outcome(
            V1_LINK,
            ScanOutcome {
                infected: false,
                description: String::new(),
                size: 1024,
                scanned_size: 1024,
            },
        )
        .await;

    let response = harness.submit(V1_LINK).await;
    assert_eq!(response.status(), 200);

    let hash = Hash::from_hex(V1_HASH).unwrap();
    harness.wait_for_status(&hash, ScanStatus::Complete).await;

    let record = harness.store.find_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(record.skylink, "");
    assert!(!record.infected);
    assert!(record.scanned_all_content);

    harness.shutdown().await;
}

#[tokio::test]
async fn infected_content_is_reported_to_the_blocker() {
    let blocker = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/block"))
        .and(body_json(serde_json::json!({
            "skylink": V1_LINK,
            "reporter": { "name": "Malware Scanner" },
            "tags": ["malware-scanner"],
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&blocker)
        .await;

    let harness = Harness::start(blocker.uri());
    harness
        .clam
        .set_outcome(
            V1_LINK,
            ScanOutcome {
                infected: true,
                description: "Eicar-Test-Signature".into(),
                size: 68,
                scanned_size: 68,
            },
        )
        .await;

    let response = harness.submit(V1_LINK).await;
    assert_eq!(response.status(), 200);

    // The verdict lands, then the reporter clears the skylink.
    let hash = Hash::from_hex(V1_HASH).unwrap();
    harness.wait_for_status(&hash, ScanStatus::Complete).await;

    let record = harness.store.find_by_hash(&hash).await.unwrap().unwrap();
    assert_eq!(record.skylink, "", "no pointer at harmful content remains");
    assert!(record.infected);
    assert_eq!(record.infection_description, "Eicar-Test-Signature");

    harness.shutdown().await;
}

#[tokio::test]
async fn duplicate_submissions_scan_once() {
    let blocker = MockServer::start().await;
    let harness = Harness::start(blocker.uri());

    assert_eq!(harness.submit(V1_LINK).await.status(), 200);
    assert_eq!(harness.submit(V1_LINK).await.status(), 200);

    let hash = Hash::from_hex(V1_HASH).unwrap();
    harness.wait_for_status(&hash, ScanStatus::Complete).await;

    assert_eq!(harness.store.len().await, 1);
    assert_eq!(harness.clam.scanned().await, vec![V1_LINK.to_string()]);

    harness.shutdown().await;
}

#[tokio::test]
async fn shutdown_aborts_an_in_flight_scan() {
    let blocker = MockServer::start().await;
    let harness = Harness::start(blocker.uri());
    harness.clam.set_delay(Duration::from_secs(60)).await;

    assert_eq!(harness.submit(V1_LINK).await.status(), 200);

    // Give the scan loop time to claim and get stuck in the slow scan,
    // then shut down; the abort must cut the stream promptly.
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness.shutdown().await;
}

#[tokio::test]
async fn worker_state_transitions_stay_on_legal_edges() {
    let blocker = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/block"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&blocker)
        .await;

    let harness = Harness::start(blocker.uri());
    harness
        .clam
        .set_outcome(
            V1_LINK,
            ScanOutcome {
                infected: true,
                description: "X".into(),
                size: 10,
                scanned_size: 10,
            },
        )
        .await;
    harness.submit(V1_LINK).await;

    // Sample observed statuses until terminal; every one must be a state
    // the machine can legally occupy on the infected path.
    let hash = Hash::from_hex(V1_HASH).unwrap();
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(record) = harness.store.find_by_hash(&hash).await.unwrap() {
                if seen.last() != Some(&record.status) {
                    seen.push(record.status);
                }
                if record.status == ScanStatus::Complete {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("record should reach complete");

    for status in &seen {
        assert!(
            matches!(
                status,
                ScanStatus::New | ScanStatus::Scanning | ScanStatus::Unreported | ScanStatus::Complete
            ),
            "unexpected status {status}"
        );
    }
    assert_eq!(seen.first(), Some(&ScanStatus::New));
    assert_eq!(seen.last(), Some(&ScanStatus::Complete));

    harness.shutdown().await;
}
