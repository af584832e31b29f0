//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks that the Access key set is reachable

use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Readiness probe response body.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub access_keys: &'static str,
}

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 when a key set is cached or can be fetched, 503 otherwise.
/// Private routes reject every request while the key set is unreachable.
#[tracing::instrument(skip_all, name = "portfolio.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.verifier.jwks().keys(Utc::now()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                access_keys: "healthy",
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "portfolio.health", error = %e, "Readiness check failed: access keys unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    access_keys: "unhealthy",
                }),
            )
        }
    }
}
