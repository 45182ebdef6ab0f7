use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API response for the health and readiness probes
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub uptime_secs: i64,
}
