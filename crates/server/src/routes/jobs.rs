// crates/server/src/routes/jobs.rs
//! Cut job control routes.
//!
//! - POST /cut                  start a cut (202)
//! - POST /cut/pause            pause the running cut
//! - POST /cut/resume           resume the paused cut
//! - POST /cut/cancel           cancel, always acknowledged
//! - GET  /cut/progress         latest progress snapshot
//! - GET  /cut/progress/stream  SSE stream of progress snapshots

use std::convert::Infallible;
use std::sync::Arc;

use audiocut_core::{CutRequest, ProgressSnapshot};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::jobs::CancelOutcome;
use crate::metrics::RequestTimer;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StartResponse {
    pub job_id: u64,
    pub output: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// `false` when there was no running or paused job.
    pub cancelled: bool,
    #[serde(flatten)]
    pub progress: ProgressSnapshot,
}

/// POST /api/cut
async fn start_cut(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CutRequest>,
) -> ApiResult<impl IntoResponse> {
    let timer = RequestTimer::new("cut_start");
    match state.cuts.start(request).await {
        Ok(started) => {
            timer.finish_ok();
            // Completion is observed through progress; the future is not needed here.
            let response = StartResponse {
                job_id: started.job_id,
                output: started.output,
            };
            Ok((StatusCode::ACCEPTED, Json(response)))
        }
        Err(e) => {
            let err = ApiError::from(e);
            timer.finish_err(err.status().as_u16());
            Err(err)
        }
    }
}

/// POST /api/cut/pause
async fn pause_cut(State(state): State<Arc<AppState>>) -> ApiResult<Json<ProgressSnapshot>> {
    state.cuts.pause()?;
    Ok(Json(state.cuts.progress()))
}

/// POST /api/cut/resume
async fn resume_cut(State(state): State<Arc<AppState>>) -> ApiResult<Json<ProgressSnapshot>> {
    state.cuts.resume()?;
    Ok(Json(state.cuts.progress()))
}

/// POST /api/cut/cancel
async fn cancel_cut(State(state): State<Arc<AppState>>) -> Json<CancelResponse> {
    let cancelled = matches!(state.cuts.cancel(), CancelOutcome::Cancelled(_));
    Json(CancelResponse {
        cancelled,
        progress: state.cuts.progress(),
    })
}

/// GET /api/cut/progress
async fn cut_progress(State(state): State<Arc<AppState>>) -> Json<ProgressSnapshot> {
    Json(state.cuts.progress())
}

/// GET /api/cut/progress/stream
///
/// Sends the current snapshot immediately, then one event per change.
async fn stream_progress(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.cuts.subscribe();

    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            let snapshot = rx.borrow_and_update().clone();
            let json = serde_json::to_string(&snapshot).unwrap_or_default();
            yield Ok(Event::default().event("progress").data(json));
            if rx.changed().await.is_err() {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Build the cut job router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cut", post(start_cut))
        .route("/cut/pause", post(pause_cut))
        .route("/cut/resume", post(resume_cut))
        .route("/cut/cancel", post(cancel_cut))
        .route("/cut/progress", get(cut_progress))
        .route("/cut/progress/stream", get(stream_progress))
}
