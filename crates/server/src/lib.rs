// crates/server/src/lib.rs
//! Audiocut server library.
//!
//! Axum HTTP server for the audio library and the single cut job: list,
//! upload, play and download audio, and start, pause, resume, cancel and
//! watch one ffmpeg cut at a time.

pub mod error;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::*;
pub use jobs::{CancelOutcome, CutJobController, JobCompletion, JobError, StartedJob};
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use audiocut_core::AudioConfig;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
pub fn create_app(config: AudioConfig) -> Router {
    create_app_with_state(AppState::new(config))
}

/// Same as [`create_app`] around caller-owned state, so tests can reach the
/// controller directly.
pub fn create_app_with_state(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> (tempfile::TempDir, Router) {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_app(AudioConfig::new(
            tmp.path().join("library"),
            tmp.path().join("cuts"),
        ));
        (tmp, app)
    }

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_tmp, app) = app();
        let (status, body) = get(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_number());
        assert_eq!(json["cut_job"], "idle");
    }

    #[tokio::test]
    async fn test_missing_library_root_is_404() {
        let (_tmp, app) = app();
        let (status, body) = get(app, "/api/audio").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let (_tmp, app) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("Origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let allow_origin = response.headers().get("access-control-allow-origin");
        assert_eq!(allow_origin.unwrap(), "*");
    }

    #[tokio::test]
    async fn test_404_for_non_api_path() {
        let (_tmp, app) = app();
        let (status, _body) = get(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _body) = get(app, "/api/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
