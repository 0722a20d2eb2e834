// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the scanning ingress.
//!
//! Handles POST /scan/{skylink} and GET /health.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use vigil_core::{ScanRecord, VigilError};

use crate::server::GatewayState;

/// Response body for successful enqueue requests.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Human-readable outcome.
    pub message: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(rename = "dbAlive")]
    pub db_alive: bool,
    #[serde(rename = "scannerAlive")]
    pub scanner_alive: bool,
}

/// POST /scan/{skylink}
///
/// Validates and resolves the submitted skylink, then queues it for
/// scanning. Submitting a skylink whose content is already known is a
/// successful no-op.
pub async fn scan_post(
    State(state): State<GatewayState>,
    Path(skylink): Path<String>,
) -> Response {
    let (raw, hash) = match state.resolver.resolve(&skylink).await {
        Ok(resolved) => resolved,
        Err(e @ (VigilError::InvalidSkylink(_) | VigilError::Unresolvable(_))) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.store.find_by_hash(&hash).await {
        Ok(Some(_)) => (
            StatusCode::OK,
            Json(StatusResponse {
                message: "skylink already exists".to_string(),
            }),
        )
            .into_response(),
        Ok(None) => {
            let record = ScanRecord::new(raw, hash);
            match state.store.insert(&record).await {
                Ok(()) => {
                    debug!(skylink = %record.skylink, hash = %record.hash, "queued skylink");
                    (
                        StatusCode::OK,
                        Json(StatusResponse {
                            message: "skylink queued for scanning".to_string(),
                        }),
                    )
                        .into_response()
                }
                Err(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: e.to_string(),
                    }),
                )
                    .into_response(),
            }
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /health
///
/// Reports store and scanner liveness as booleans. Always 200; an
/// unhealthy collaborator is data, not an ingress failure.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let db_alive = state.store.ping().await.is_ok();
    let scanner_alive = state.scanner.ping().await.is_ok();
    Json(HealthResponse {
        db_alive,
        scanner_alive,
    })
}
