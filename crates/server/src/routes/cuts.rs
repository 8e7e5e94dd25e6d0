// crates/server/src/routes/cuts.rs
//! Produced cuts, grouped by the day they were made.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    response::Response,
    routing::get,
    Json, Router,
};

use super::audio::{blocking, serve_file, Disposition};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/cuts - `{ "<yyyy-MM-dd>": [files] }`
async fn list_cuts(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BTreeMap<String, Vec<String>>>> {
    let library = state.library.clone();
    Ok(Json(blocking(move || library.cuts()).await?))
}

/// GET /api/cuts/play/{date}/{file}
async fn play_cut(
    State(state): State<Arc<AppState>>,
    Path((date, file)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let path = state.library.resolve_cut(&date, &file)?;
    serve_file(&path, request, Disposition::Inline).await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cuts", get(list_cuts))
        .route("/cuts/play/{date}/{file}", get(play_cut))
}
