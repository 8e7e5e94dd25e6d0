// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing or spawning the transcoding tool.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Transcoding tool not found: {program}")]
    ToolNotFound { program: String },

    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to capture {stream} of {program}")]
    Pipe { program: String, stream: &'static str },
}

impl LaunchError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        let program = program.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::ToolNotFound { program },
            _ => Self::Spawn { program, source },
        }
    }
}

/// Errors that can occur when reading the audio library or the cuts tree.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Invalid name: {name:?}")]
    InvalidName { name: String },

    #[error("IO error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LibraryError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// A cut request that can never be executed.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("start offset must be a finite number >= 0, got {0}")]
    InvalidStart(f64),

    #[error("duration must be a finite number > 0, got {0}")]
    InvalidDuration(f64),

    #[error("file name must not be empty")]
    EmptyFileName,
}
