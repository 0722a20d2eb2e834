// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingress HTTP server built on axum.
//!
//! Sets up routes and shared state, and honors the process-wide
//! cancellation token via graceful shutdown.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use vigil_core::{MalwareScanner, ScanStore, VigilError};
use vigil_skylink::SkylinkResolver;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Queue store for enqueueing and the health probe.
    pub store: Arc<dyn ScanStore>,
    /// Scanner client, used by the health probe only.
    pub scanner: Arc<dyn MalwareScanner>,
    /// Resolver reducing submitted skylinks to canonical hashes.
    pub resolver: SkylinkResolver,
}

/// Starts the ingress HTTP server on the given port.
///
/// Serves until `cancel` fires, then stops accepting new requests and
/// lets in-flight requests finish.
pub async fn start_server(
    port: u16,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), VigilError> {
    let app = Router::new()
        .route("/scan/{skylink}", post(handlers::scan_post))
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| VigilError::Internal(format!("failed to bind ingress to {addr}: {e}")))?;

    info!("ingress listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| VigilError::Internal(format!("ingress server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_test_utils::{MemStore, MockScanner};

    #[tokio::test]
    async fn server_stops_on_cancellation() {
        let state = GatewayState {
            store: Arc::new(MemStore::new()),
            scanner: Arc::new(MockScanner::new("https://portal.test")),
            resolver: SkylinkResolver::new("https://portal.test".into()),
        };
        let cancel = CancellationToken::new();

        let server = {
            let cancel = cancel.clone();
            // Port 0 binds an ephemeral port, so the test never collides.
            tokio::spawn(async move { start_server(0, state, cancel).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), server)
            .await
            .expect("server should exit on cancel")
            .unwrap();
        assert!(result.is_ok());
    }
}
