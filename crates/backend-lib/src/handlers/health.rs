//! `GET /health`
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use keygate_common::{HealthResponse, HealthStatus};

use crate::AppState;

/// Ready when a token can be signed and validated
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match state.auth.health() {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: HealthStatus::Ok,
            }),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: HealthStatus::Unavailable,
                }),
            )
        },
    }
}
