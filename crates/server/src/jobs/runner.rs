// crates/server/src/jobs/runner.rs
//! Controller for the single long-running cut job.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use audiocut_core::{
    cut_command, describe_exit, launcher, prepare_output, probe_duration, AudioConfig,
    AudioLibrary, CutRequest, JobState, ProcessHandle, ProgressPolicy, ProgressSnapshot,
    ProgressTracker,
};
use tokio::sync::{oneshot, watch};

use super::state::JobSlot;
use super::types::{CancelOutcome, Control, JobCompletion, JobError, JobId, StartedJob};
use crate::metrics;

/// Owns the job slot and the progress feed.
///
/// Control calls (`start`, `pause`, `resume`, `cancel`) change the slot
/// under a short critical section and never wait on the process. Cancel
/// sends the kill itself; everything else happens in the worker task spawned
/// by `start`, which observes the per-job control channel and reaps the
/// process.
pub struct CutJobController {
    config: AudioConfig,
    library: AudioLibrary,
    slot: Mutex<JobSlot>,
    progress_tx: watch::Sender<ProgressSnapshot>,
}

impl CutJobController {
    pub fn new(config: AudioConfig) -> Self {
        let library = AudioLibrary::new(&config.library_dir, &config.output_dir);
        let (progress_tx, _) = watch::channel(ProgressSnapshot::idle());
        Self {
            config,
            library,
            slot: Mutex::new(JobSlot::new()),
            progress_tx,
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn library(&self) -> &AudioLibrary {
        &self.library
    }

    /// Validate, launch the tool and occupy the slot.
    ///
    /// On any error the slot is left exactly as it was.
    pub async fn start(self: &Arc<Self>, request: CutRequest) -> Result<StartedJob, JobError> {
        request.validate()?;
        self.lock_slot().ensure_available()?;

        let input = self.library.resolve_source(&request.source)?;
        let expected = self.expected_length(&input, &request).await;
        let policy = ProgressPolicy::for_total(Some(expected), self.config.fixed_step_percent);
        if let ProgressPolicy::FixedStep { step } = policy {
            tracing::warn!(
                input = %input.display(),
                start_offset_secs = request.start_offset_secs,
                step,
                "no usable output length; progress falls back to fixed steps"
            );
        }

        let output = prepare_output(
            &self.config.output_dir,
            chrono::Local::now().date_naive(),
            &request.source.file_name,
        )?;

        let mut slot = self.lock_slot();
        // Another start may have won while we were probing.
        slot.ensure_available()?;

        let spec = cut_command(
            &self.config.ffmpeg_path,
            &input,
            &output,
            request.start_offset_secs,
            request.duration_secs,
        );
        let process = launcher::spawn(&spec)?;

        let output_ref = self.library.output_ref(&output);
        let (job_id, control_rx) = slot.begin(output_ref.clone(), process.kill_handle())?;
        self.publish(&slot);
        drop(slot);

        tracing::info!(
            job_id,
            pid = ?process.pid(),
            command = %spec.display(),
            ?policy,
            "cut job started"
        );
        metrics::record_cut_started();

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(Arc::clone(self).run_worker(
            job_id,
            process,
            control_rx,
            ProgressTracker::new(policy),
            done_tx,
        ));

        Ok(StartedJob {
            job_id,
            output: output_ref,
            completion: JobCompletion::new(done_rx),
        })
    }

    pub fn pause(&self) -> Result<JobId, JobError> {
        let job_id = self.update(JobSlot::pause)?;
        tracing::info!(job_id, "cut job paused");
        Ok(job_id)
    }

    pub fn resume(&self) -> Result<JobId, JobError> {
        let job_id = self.update(JobSlot::resume)?;
        tracing::info!(job_id, "cut job resumed");
        Ok(job_id)
    }

    /// Always acknowledged. Only a Running or Paused job is affected.
    pub fn cancel(&self) -> CancelOutcome {
        let outcome = self.update(JobSlot::cancel);
        match &outcome {
            CancelOutcome::Cancelled(job_id) => tracing::info!(job_id, "cut job cancelled"),
            CancelOutcome::NotActive(state) => {
                tracing::debug!(state = %state, "cancel requested with no active cut job")
            }
        }
        outcome
    }

    /// Latest snapshot. Never blocks on the worker.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress_tx.borrow().clone()
    }

    /// Feed of snapshots, for SSE streaming.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_tx.subscribe()
    }

    /// Length of output the tool is expected to produce, in seconds.
    ///
    /// The requested duration, clamped to what is left of the input after
    /// the start offset when the input length can be probed. A start past
    /// the end of the input yields zero.
    async fn expected_length(&self, input: &Path, request: &CutRequest) -> f64 {
        if !self.config.probe_duration {
            return request.duration_secs;
        }
        let limit = Duration::from_secs(self.config.probe_timeout_secs);
        match probe_duration(&self.config.ffmpeg_path, input, limit).await {
            Ok(Some(length)) => request
                .duration_secs
                .min(length - request.start_offset_secs)
                .max(0.0),
            Ok(None) => request.duration_secs,
            Err(e) => {
                tracing::warn!(error = %e, "duration probe failed");
                request.duration_secs
            }
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, JobSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| {
            tracing::error!("cut job slot mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Apply `f` to the slot and publish the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut JobSlot) -> R) -> R {
        let mut slot = self.lock_slot();
        let result = f(&mut slot);
        self.publish(&slot);
        result
    }

    fn publish(&self, slot: &JobSlot) {
        let snapshot = slot.snapshot();
        self.progress_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }

    async fn run_worker(
        self: Arc<Self>,
        job_id: JobId,
        mut process: ProcessHandle,
        mut control: watch::Receiver<Control>,
        mut tracker: ProgressTracker,
        done: oneshot::Sender<JobState>,
    ) {
        let started = Instant::now();
        let outcome = self
            .drive(job_id, &mut process, &mut control, &mut tracker)
            .await;
        let state = self.update(|slot| slot.finish(job_id, outcome));

        let elapsed = started.elapsed();
        tracing::info!(
            job_id,
            state = %state,
            elapsed_ms = elapsed.as_millis() as u64,
            "cut job finished"
        );
        metrics::record_cut_finished(state.as_str(), elapsed);
        let _ = done.send(state);
    }

    /// Pump output lines until the process exits or is cancelled.
    async fn drive(
        &self,
        job_id: JobId,
        process: &mut ProcessHandle,
        control: &mut watch::Receiver<Control>,
        tracker: &mut ProgressTracker,
    ) -> JobState {
        let mut suspended = false;
        loop {
            let current = *control.borrow_and_update();
            match current {
                Control::Cancel => return terminate(job_id, process).await,
                Control::Pause => {
                    if !suspended {
                        if let Err(e) = process.suspend() {
                            tracing::warn!(job_id, error = %e, "failed to suspend tool process");
                        }
                        suspended = true;
                    }
                    if control.changed().await.is_err() {
                        return terminate(job_id, process).await;
                    }
                    continue;
                }
                Control::Run => {
                    if suspended {
                        if let Err(e) = process.resume() {
                            tracing::warn!(job_id, error = %e, "failed to resume tool process");
                        }
                        suspended = false;
                    }
                }
            }

            let step = tokio::select! {
                changed = control.changed() => Step::Control(changed.is_ok()),
                line = process.next_line() => Step::Line(line),
            };
            match step {
                Step::Control(true) => continue,
                Step::Control(false) => return terminate(job_id, process).await,
                Step::Line(Some(line)) => {
                    tracing::trace!(job_id, line = %line, "tool output");
                    if let Some(percent) = tracker.observe_line(&line) {
                        self.record_progress(job_id, percent);
                    }
                }
                Step::Line(None) => break,
            }
        }

        // Both pipes are closed; the process may still be exiting.
        let waited = tokio::select! {
            status = process.wait() => Some(status),
            _ = cancel_requested(control) => None,
        };
        match waited {
            None => terminate(job_id, process).await,
            Some(Ok(status)) if status.success() => {
                tracker.finish();
                JobState::Completed
            }
            Some(Ok(status)) => JobState::Failed {
                reason: describe_exit(&status),
            },
            Some(Err(e)) => JobState::Failed {
                reason: format!("failed to wait for {}: {e}", process.program()),
            },
        }
    }

    fn record_progress(&self, job_id: JobId, percent: u8) {
        let mut slot = self.lock_slot();
        if slot.record_progress(job_id, percent) {
            self.publish(&slot);
            drop(slot);
            metrics::record_cut_progress(percent);
        }
    }
}

enum Step {
    /// `false` once the control sender is gone.
    Control(bool),
    Line(Option<String>),
}

/// Resolves once cancel is signalled or the control sender is dropped.
async fn cancel_requested(control: &mut watch::Receiver<Control>) {
    loop {
        if *control.borrow_and_update() == Control::Cancel {
            return;
        }
        if control.changed().await.is_err() {
            return;
        }
    }
}

/// Cancel has usually killed the process already; this reaps it.
async fn terminate(job_id: JobId, process: &mut ProcessHandle) -> JobState {
    // SIGKILL also ends a stopped process.
    if let Err(e) = process.kill().await {
        tracing::warn!(job_id, error = %e, "failed to kill tool process");
    }
    JobState::Cancelled
}
