//! API route handlers for the audiocut server.

pub mod audio;
pub mod cuts;
pub mod health;
pub mod jobs;
pub mod metrics;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/metrics - Prometheus metrics
/// - GET  /api/audio - Every file in the library
/// - GET  /api/audio/collections - Collection folder names
/// - GET  /api/audio/collections/{collection} - Files of one collection
/// - POST /api/audio/upload - Multipart upload
/// - GET  /api/audio/play/{collection}/{file} - Inline audio stream
/// - GET  /api/audio/download/{file} - Attachment download
/// - GET  /api/cuts - Produced cuts grouped by date
/// - GET  /api/cuts/play/{date}/{file} - Inline stream of a cut
/// - POST /api/cut - Start a cut job
/// - POST /api/cut/pause - Pause the running cut
/// - POST /api/cut/resume - Resume the paused cut
/// - POST /api/cut/cancel - Cancel the active cut
/// - GET  /api/cut/progress - Latest progress snapshot
/// - GET  /api/cut/progress/stream - SSE stream of progress
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", metrics::router())
        .nest("/api", audio::router())
        .nest("/api", cuts::router())
        .nest("/api", jobs::router())
        .with_state(state)
}
