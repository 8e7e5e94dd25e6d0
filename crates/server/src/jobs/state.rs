// crates/server/src/jobs/state.rs
//! State of the single cut job slot.
//!
//! Transition logic with no awaits. The controller keeps one `JobSlot`
//! behind a mutex and publishes a snapshot after every change. The only side
//! effect is cancel, which kills the process before it returns.

use audiocut_core::{JobState, KillHandle, ProgressSnapshot};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::types::{CancelOutcome, Control, JobError, JobId};

/// The one slot a cut job can occupy.
///
/// `job_id` is a generation counter bumped on every successful start;
/// updates carrying an older id are dropped, so a finished worker can never
/// overwrite the job that replaced it.
///
/// The slot stays occupied from `begin` until the worker calls `finish`,
/// including after a cancel, so a new process never starts alongside one
/// that is still exiting.
#[derive(Debug)]
pub struct JobSlot {
    job_id: JobId,
    state: JobState,
    percent: u8,
    output: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    control: Option<watch::Sender<Control>>,
    /// Present while the worker of `job_id` is live.
    process: Option<KillHandle>,
}

impl Default for JobSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl JobSlot {
    pub fn new() -> Self {
        Self {
            job_id: 0,
            state: JobState::Idle,
            percent: 0,
            output: None,
            started_at: None,
            finished_at: None,
            control: None,
            process: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// `Conflict` while a job is running or paused, `Stopping` while a
    /// cancelled job's worker is still winding down.
    pub fn ensure_available(&self) -> Result<(), JobError> {
        if self.state.is_active() {
            return Err(JobError::Conflict(self.state.clone()));
        }
        if self.process.is_some() {
            return Err(JobError::Stopping);
        }
        Ok(())
    }

    /// Occupy the slot for a freshly spawned process.
    ///
    /// Returns the new job id and the control receiver for its worker.
    pub fn begin(
        &mut self,
        output: String,
        process: KillHandle,
    ) -> Result<(JobId, watch::Receiver<Control>), JobError> {
        self.ensure_available()?;
        let (control_tx, control_rx) = watch::channel(Control::Run);
        self.job_id += 1;
        self.state = JobState::Running;
        self.percent = 0;
        self.output = Some(output);
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.control = Some(control_tx);
        self.process = Some(process);
        Ok((self.job_id, control_rx))
    }

    pub fn pause(&mut self) -> Result<JobId, JobError> {
        if self.state != JobState::Running {
            return Err(self.invalid("pause"));
        }
        self.state = JobState::Paused;
        self.signal(Control::Pause);
        Ok(self.job_id)
    }

    pub fn resume(&mut self) -> Result<JobId, JobError> {
        if self.state != JobState::Paused {
            return Err(self.invalid("resume"));
        }
        self.state = JobState::Running;
        self.signal(Control::Run);
        Ok(self.job_id)
    }

    /// Cancel the active job and kill its process, whether or not the
    /// worker has seen the cancel yet. Outside Running/Paused nothing changes.
    pub fn cancel(&mut self) -> CancelOutcome {
        if !self.state.is_active() {
            return CancelOutcome::NotActive(self.state.clone());
        }
        self.state = JobState::Cancelled;
        self.finished_at = Some(Utc::now());
        self.signal(Control::Cancel);
        if let Some(process) = &self.process {
            if let Err(e) = process.kill() {
                tracing::warn!(job_id = self.job_id, error = %e, "failed to kill tool process");
            }
        }
        CancelOutcome::Cancelled(self.job_id)
    }

    /// Raise the percentage of job `job_id`. Ignored unless it is still Running.
    pub fn record_progress(&mut self, job_id: JobId, percent: u8) -> bool {
        if job_id != self.job_id || self.state != JobState::Running || percent <= self.percent {
            return false;
        }
        self.percent = percent;
        true
    }

    /// Record how the worker of `job_id` ended and return the state the slot
    /// now reports for it.
    ///
    /// A cancel that raced the natural exit wins: once Cancelled, the slot
    /// stays Cancelled.
    pub fn finish(&mut self, job_id: JobId, outcome: JobState) -> JobState {
        if job_id != self.job_id {
            return outcome;
        }
        if self.state.is_active() {
            if outcome == JobState::Completed {
                self.percent = 100;
            }
            self.state = outcome;
            self.finished_at = Some(Utc::now());
        }
        self.control = None;
        self.process = None;
        self.state.clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            job_id: self.job_id,
            state: self.state.clone(),
            percent_complete: self.percent,
            output: self.output.clone(),
            started_at: self.started_at.map(|t| t.to_rfc3339()),
            finished_at: self.finished_at.map(|t| t.to_rfc3339()),
        }
    }

    fn signal(&self, control: Control) {
        if let Some(tx) = &self.control {
            tx.send_replace(control);
        }
    }

    fn invalid(&self, op: &'static str) -> JobError {
        JobError::InvalidState {
            op,
            state: self.state.clone(),
        }
    }
}
