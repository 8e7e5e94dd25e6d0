// crates/server/src/jobs/types.rs
//! Types for the cut job controller.

use audiocut_core::{JobState, LaunchError, LibraryError, RequestError};
use thiserror::Error;
use tokio::sync::oneshot;

/// Unique identifier of one cut job (the slot generation).
pub type JobId = u64;

/// Control signal observed by the worker.
///
/// Carried in a watch channel created fresh for every job, so a wake-up
/// meant for one job can never reach the next. `Cancel` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Run,
    Pause,
    Cancel,
}

/// Errors surfaced synchronously to control-plane callers.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("a cut job is already {0}")]
    Conflict(JobState),

    /// Cancelled, but its worker has not reported the process gone yet.
    #[error("the cancelled cut job is still shutting down")]
    Stopping,

    #[error("cannot {op} a cut job that is {state}")]
    InvalidState { op: &'static str, state: JobState },

    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    #[error(transparent)]
    Source(#[from] LibraryError),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Result of a cancel call. Cancelling is always acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled(JobId),
    /// No running or paused job; the slot is left as it was.
    NotActive(JobState),
}

/// Returned by a successful start. The caller may drop `completion`.
#[derive(Debug)]
pub struct StartedJob {
    pub job_id: JobId,
    /// Output path relative to the cuts root (`yyyy-MM-dd/cut_<file>`).
    pub output: String,
    pub completion: JobCompletion,
}

/// Resolves with the job's terminal state.
#[derive(Debug)]
pub struct JobCompletion {
    rx: oneshot::Receiver<JobState>,
}

impl JobCompletion {
    pub(crate) fn new(rx: oneshot::Receiver<JobState>) -> Self {
        Self { rx }
    }

    pub async fn wait(self) -> JobState {
        self.rx.await.unwrap_or_else(|_| JobState::Failed {
            reason: "worker ended without reporting an outcome".to_string(),
        })
    }
}
