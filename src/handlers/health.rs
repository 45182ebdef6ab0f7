use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::{debug, error};

use crate::models::{ErrorResponse, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Readiness check endpoint, fails while the room directory is unreachable
pub async fn ready_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Readiness check requested");
    if let Err(e) = state.directory.exists("").await {
        error!("Room directory ({}) not ready: {}", state.directory.backend(), e);
        return Err(ErrorResponse::reply(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Room directory unavailable: {}", e),
        ));
    }
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    }))
}
