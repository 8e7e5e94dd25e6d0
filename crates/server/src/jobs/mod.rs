// crates/server/src/jobs/mod.rs
//! The cut job controller.
//!
//! Provides:
//! - `CutJobController`: owns the single job slot and the worker task
//! - `JobSlot`: state transitions of that slot
//! - `JobError` / `CancelOutcome`: control-plane results
//! - `StartedJob` / `JobCompletion`: what `start` hands back

pub mod runner;
pub mod state;
pub mod types;

pub use runner::CutJobController;
pub use state::JobSlot;
pub use types::{CancelOutcome, Control, JobCompletion, JobError, JobId, StartedJob};
