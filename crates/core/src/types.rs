// crates/core/src/types.rs
//! Value types shared by the launcher, the job controller and the HTTP layer.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// A file inside the audio library, optionally inside a collection folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub file_name: String,
}

impl SourceRef {
    pub fn new(collection: Option<String>, file_name: impl Into<String>) -> Self {
        Self {
            collection,
            file_name: file_name.into(),
        }
    }
}

/// Immutable description of one trim operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutRequest {
    pub source: SourceRef,
    pub start_offset_secs: f64,
    pub duration_secs: f64,
}

impl CutRequest {
    pub fn new(source: SourceRef, start_offset_secs: f64, duration_secs: f64) -> Self {
        Self {
            source,
            start_offset_secs,
            duration_secs,
        }
    }

    /// Reject requests the tool could never satisfy.
    pub fn validate(&self) -> Result<(), RequestError> {
        if !self.start_offset_secs.is_finite() || self.start_offset_secs < 0.0 {
            return Err(RequestError::InvalidStart(self.start_offset_secs));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(RequestError::InvalidDuration(self.duration_secs));
        }
        if self.source.file_name.trim().is_empty() {
            return Err(RequestError::EmptyFileName);
        }
        Ok(())
    }
}

/// Phase of the single cut job slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
    Failed { reason: String },
}

impl JobState {
    /// Running or Paused: the slot is occupied.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed ({reason})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// What polling clients see. `job_id` 0 means no job has run yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub job_id: u64,
    #[serde(flatten)]
    pub state: JobState,
    pub percent_complete: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl ProgressSnapshot {
    pub fn idle() -> Self {
        Self {
            job_id: 0,
            state: JobState::Idle,
            percent_complete: 0,
            output: None,
            started_at: None,
            finished_at: None,
        }
    }
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
