// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vigil serve` command implementation.
//!
//! Wires the store, the ClamAV client, the three background workers and
//! the HTTP ingress together, and runs them until a shutdown signal
//! arrives. Startup failures (bad configuration, unreachable store or
//! scanner) are fatal.

use std::sync::Arc;

use tracing::{error, info};

use vigil_clamav::ClamAv;
use vigil_config::model::VigilConfig;
use vigil_core::VigilError;
use vigil_gateway::GatewayState;
use vigil_scanner::{install_signal_handler, Scanner};
use vigil_skylink::SkylinkResolver;
use vigil_store::PgStore;

/// Runs the `vigil serve` command.
pub async fn run_serve(config: VigilConfig) -> Result<(), VigilError> {
    init_tracing(&config.log.level);

    info!("starting vigil serve");
    config.validate()?;

    // Connect the store and ensure its schema.
    let connection_string = config.db.connection_string()?;
    let store = Arc::new(
        PgStore::connect(&connection_string, config.worker.scan_timeout())
            .await
            .map_err(|e| {
                error!(error = %e, "failed to connect to the store");
                e
            })?,
    );
    info!("store connected");

    // Connect to ClamAV; the constructor verifies the daemon answers.
    let portal = config.portal.url()?;
    let scanner_addr = config.scanner.addr()?;
    let clam = Arc::new(
        ClamAv::connect(scanner_addr.clone(), portal.clone())
            .await
            .map_err(|e| {
                error!(error = %e, addr = %scanner_addr, "cannot connect to ClamAV");
                e
            })?,
    );
    info!(addr = %scanner_addr, portal = %portal, "ClamAV connected");

    let scanner = Arc::new(Scanner::new(
        store.clone(),
        clam.clone(),
        config.blocker.url()?,
        config.worker.clone(),
    ));

    // Install the signal handler; its token is both the loop shutdown
    // signal and the abort for an in-flight scanner stream.
    let cancel = install_signal_handler();

    let scan_task = {
        let scanner = scanner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scanner.run_scan_loop(cancel).await })
    };
    let report_task = {
        let scanner = scanner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scanner.run_report_loop(cancel).await })
    };
    let reaper_task = {
        let scanner = scanner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scanner.run_reaper_loop(cancel).await })
    };

    let state = GatewayState {
        store: store.clone(),
        scanner: clam,
        resolver: SkylinkResolver::new(portal),
    };
    let served = vigil_gateway::start_server(config.server.port, state, cancel.clone()).await;

    // The server exited, either through the shutdown signal or an error.
    // Either way the workers must wind down before we return.
    cancel.cancel();
    let _ = tokio::join!(scan_task, report_task, reaper_task);

    info!("vigil serve shutdown complete");
    served
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let directives = [
        "vigil",
        "vigil_clamav",
        "vigil_config",
        "vigil_gateway",
        "vigil_scanner",
        "vigil_skylink",
        "vigil_store",
    ]
    .map(|target| format!("{target}={log_level}"))
    .join(",");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,{directives}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
