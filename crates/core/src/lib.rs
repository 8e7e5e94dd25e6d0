// crates/core/src/lib.rs
pub mod config;
pub mod error;
pub mod launcher;
pub mod library;
pub mod paths;
pub mod probe;
pub mod progress;
pub mod types;

pub use config::AudioConfig;
pub use error::*;
pub use launcher::{cut_command, describe_exit, prepare_output, spawn, CommandSpec, KillHandle, ProcessHandle};
pub use library::AudioLibrary;
pub use probe::probe_duration;
pub use progress::{parse_duration_marker, parse_time_marker, ProgressPolicy, ProgressTracker};
pub use types::*;
