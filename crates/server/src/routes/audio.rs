// crates/server/src/routes/audio.rs
//! Audio library routes.
//!
//! - GET  /audio                            every file in the library
//! - GET  /audio/collections                collection folder names
//! - GET  /audio/collections/{collection}   files of one collection
//! - POST /audio/upload                     multipart upload
//! - GET  /audio/play/{collection}/{file}   inline, range-aware stream
//! - GET  /audio/download/{file}            attachment from the library root

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use audiocut_core::{LibraryError, SourceRef};
use axum::{
    body::Body,
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderValue},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Largest accepted upload body.
const UPLOAD_LIMIT_BYTES: usize = 1024 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CollectionFiles {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct UploadResponse {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub size_bytes: u64,
}

/// Run a synchronous library walk off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, LibraryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("library task failed: {e}")))?
        .map_err(ApiError::from)
}

/// GET /api/audio
async fn list_all(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    let library = state.library.clone();
    Ok(Json(blocking(move || library.all_files()).await?))
}

/// GET /api/audio/collections
async fn list_collections(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    let library = state.library.clone();
    Ok(Json(blocking(move || library.collections()).await?))
}

/// GET /api/audio/collections/{collection}
async fn list_collection(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> ApiResult<Json<CollectionFiles>> {
    let library = state.library.clone();
    let files = blocking(move || library.collection_files(&collection)).await?;
    Ok(Json(CollectionFiles { files }))
}

/// POST /api/audio/upload
///
/// Fields: `file` (required), `collection` (optional). The body is staged
/// next to the library root and moved into place once fully received.
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut collection: Option<String> = None;
    let mut staged: Option<(String, PathBuf, u64)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("collection") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable collection field: {e}")))?;
                let text = text.trim();
                collection = (!text.is_empty()).then(|| text.to_string());
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("file field has no file name".into()))?;
                let staging = state.library.upload_path(None, &format!(".{file_name}.part"))?;
                let size = stage(field, &staging).await?;
                if let Some((_, previous, _)) = staged.replace((file_name, staging, size)) {
                    let _ = tokio::fs::remove_file(previous).await;
                }
            }
            _ => {}
        }
    }

    let (file_name, staging, size_bytes) =
        staged.ok_or_else(|| ApiError::BadRequest("missing file field".into()))?;
    if size_bytes == 0 {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(ApiError::BadRequest("uploaded file is empty".into()));
    }

    let dest = match state.library.upload_path(collection.as_deref(), &file_name) {
        Ok(dest) => dest,
        Err(e) => {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
    };
    tokio::fs::rename(&staging, &dest)
        .await
        .map_err(|e| ApiError::Library(LibraryError::io(&dest, e)))?;

    tracing::info!(path = %dest.display(), size_bytes, "audio file uploaded");
    Ok(Json(UploadResponse {
        file_name,
        collection,
        size_bytes,
    }))
}

/// Write one multipart field to `path`; the partial file is removed on error.
async fn stage(mut field: Field<'_>, path: &FsPath) -> ApiResult<u64> {
    let result = async {
        let mut out = tokio::fs::File::create(path)
            .await
            .map_err(|e| ApiError::Library(LibraryError::io(path, e)))?;
        let mut written = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("upload interrupted: {e}")))?
        {
            out.write_all(&chunk)
                .await
                .map_err(|e| ApiError::Library(LibraryError::io(path, e)))?;
            written += chunk.len() as u64;
        }
        out.flush()
            .await
            .map_err(|e| ApiError::Library(LibraryError::io(path, e)))?;
        Ok(written)
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(path).await;
    }
    result
}

/// GET /api/audio/play/{collection}/{file}
async fn play(
    State(state): State<Arc<AppState>>,
    Path((collection, file)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let path = state
        .library
        .resolve_source(&SourceRef::new(Some(collection), file))?;
    serve_file(&path, request, Disposition::Inline).await
}

/// GET /api/audio/download/{file}
async fn download(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let path = state.library.resolve_source(&SourceRef::new(None, file))?;
    serve_file(&path, request, Disposition::Attachment).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    Inline,
    Attachment,
}

/// Serve a file with content type and range handling from `ServeFile`.
pub(crate) async fn serve_file(
    path: &FsPath,
    request: Request,
    disposition: Disposition,
) -> ApiResult<Response> {
    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };
    let value = format!("{kind}; filename*=UTF-8''{}", urlencoding::encode(&name));
    if let Ok(value) = HeaderValue::from_str(&value) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/audio", get(list_all))
        .route("/audio/collections", get(list_collections))
        .route("/audio/collections/{collection}", get(list_collection))
        .route(
            "/audio/upload",
            post(upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/audio/play/{collection}/{file}", get(play))
        .route("/audio/download/{file}", get(download))
}
