// crates/server/src/error.rs
use audiocut_core::LibraryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::jobs::JobError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Cut job error: {0}")]
    Job(#[from] JobError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Status code the error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Library(lib_err) | ApiError::Job(JobError::Source(lib_err)) => {
                library_status(lib_err)
            }
            ApiError::Job(
                JobError::Conflict(_) | JobError::Stopping | JobError::InvalidState { .. },
            ) => StatusCode::CONFLICT,
            ApiError::Job(JobError::InvalidRequest(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Job(JobError::Launch(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Library(lib_err) => library_error(lib_err),
            ApiError::Job(job_err) => job_error(job_err),
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                ErrorResponse::new("Internal server error")
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                ErrorResponse::with_details("Bad request", msg.clone())
            }
        };

        (self.status(), Json(body)).into_response()
    }
}

fn library_status(err: &LibraryError) -> StatusCode {
    match err {
        LibraryError::NotFound { .. } => StatusCode::NOT_FOUND,
        LibraryError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        LibraryError::InvalidName { .. } => StatusCode::BAD_REQUEST,
        LibraryError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Library paths are server-side; only the final component is reported.
fn library_error(err: &LibraryError) -> ErrorResponse {
    match err {
        LibraryError::NotFound { path } => {
            tracing::warn!(path = %path.display(), "File not found");
            ErrorResponse::with_details("File not found", display_name(path))
        }
        LibraryError::PermissionDenied { path } => {
            tracing::error!(path = %path.display(), "Permission denied");
            ErrorResponse::with_details("Permission denied", display_name(path))
        }
        LibraryError::InvalidName { name } => {
            tracing::warn!(name = %name, "Invalid file or folder name");
            ErrorResponse::with_details("Invalid name", err.to_string())
        }
        LibraryError::Io { path, source } => {
            tracing::error!(path = %path.display(), error = %source, "IO error");
            ErrorResponse::new("IO error accessing library")
        }
    }
}

fn job_error(err: &JobError) -> ErrorResponse {
    match err {
        JobError::Conflict(_) | JobError::Stopping | JobError::InvalidState { .. } => {
            tracing::warn!(error = %err, "Cut job conflict");
            ErrorResponse::with_details("Conflict", err.to_string())
        }
        JobError::InvalidRequest(req_err) => {
            tracing::warn!(error = %req_err, "Invalid cut request");
            ErrorResponse::with_details("Bad request", req_err.to_string())
        }
        JobError::Source(lib_err) => library_error(lib_err),
        JobError::Launch(launch_err) => {
            tracing::error!(error = %launch_err, "Failed to launch cut job");
            ErrorResponse::new("Failed to launch transcoding tool")
        }
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use audiocut_core::{JobState, LaunchError, RequestError};
    use axum::body::to_bytes;
    use std::path::PathBuf;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_conflict_returns_409() {
        let error = ApiError::Job(JobError::Conflict(JobState::Running));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "Conflict");
        assert!(body.details.unwrap().contains("running"));
    }

    #[tokio::test]
    async fn test_invalid_state_returns_409() {
        let error = ApiError::Job(JobError::InvalidState {
            op: "pause",
            state: JobState::Idle,
        });
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.details.unwrap().contains("cannot pause"));
    }

    #[tokio::test]
    async fn test_invalid_request_returns_400() {
        let error = ApiError::Job(JobError::InvalidRequest(RequestError::InvalidDuration(0.0)));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Bad request");
    }

    #[tokio::test]
    async fn test_missing_source_returns_404_without_full_path() {
        let error = ApiError::Job(JobError::Source(LibraryError::NotFound {
            path: PathBuf::from("/srv/audio/radio-1/show.mp3"),
        }));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "File not found");
        assert_eq!(body.details.as_deref(), Some("show.mp3"));
    }

    #[tokio::test]
    async fn test_launch_error_hides_details() {
        let error = ApiError::Job(JobError::Launch(LaunchError::ToolNotFound {
            program: "/opt/ffmpeg".into(),
        }));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_library_errors() {
        let error = ApiError::Library(LibraryError::InvalidName { name: "..".into() });
        let (status, _) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error = ApiError::Library(LibraryError::PermissionDenied {
            path: PathBuf::from("/srv/audio/locked"),
        });
        let (status, _) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let error = ApiError::Library(LibraryError::Io {
            path: PathBuf::from("/srv/audio"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk error"),
        });
        let (status, body) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "IO error accessing library");
    }

    #[tokio::test]
    async fn test_internal_error_returns_500() {
        let error = ApiError::Internal("Something went wrong".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        // Internal errors should NOT expose details to clients
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("Test error");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"error\":\"Test error\""));
        assert!(!json.contains("details"));

        let response = ErrorResponse::with_details("Test error", "More info");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"details\":\"More info\""));
    }

    #[tokio::test]
    async fn test_stopping_returns_409() {
        let error = ApiError::Job(JobError::Stopping);
        assert_eq!(error.status(), StatusCode::CONFLICT);
        let (status, body) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.details.unwrap().contains("shutting down"));
    }

    #[test]
    fn test_status_follows_the_library_error_inside_a_job_error() {
        let err = ApiError::Job(JobError::Source(LibraryError::InvalidName { name: "..".into() }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::Job(JobError::Source(LibraryError::PermissionDenied {
            path: PathBuf::from("/srv/audio/locked"),
        }));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = ApiError::Job(JobError::Source(LibraryError::Io {
            path: PathBuf::from("/srv/audio"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk error"),
        }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_display() {
        let err: ApiError = JobError::Conflict(JobState::Paused).into();
        assert_eq!(err.to_string(), "Cut job error: a cut job is already paused");
    }
}
