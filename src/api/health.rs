//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since startup
    pub uptime: u64,
    pub requests: u64,
    pub avg_response_time_us: f64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = &state.request_stats;
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: stats.uptime_seconds(),
        requests: stats.total_requests(),
        avg_response_time_us: stats.avg_response_time_us(),
    })
}
