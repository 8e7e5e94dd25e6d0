// crates/server/src/routes/health.rs
//! Health check endpoint for the API.

use std::sync::Arc;

use audiocut_core::JobState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Response for the health check endpoint.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// State of the cut job slot (`idle`, `running`, ...).
    pub cut_job: String,
}

/// GET /api/health - Returns server status, version, uptime and cut slot state.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.cuts.progress();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        cut_job: JobState::as_str(&snapshot.state).to_string(),
    })
}

/// Create the health routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
