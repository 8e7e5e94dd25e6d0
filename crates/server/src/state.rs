// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use audiocut_core::{AudioConfig, AudioLibrary};

use crate::jobs::CutJobController;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Library and cuts roots, shared with the controller.
    pub library: AudioLibrary,
    /// The single cut job slot and its worker.
    pub cuts: Arc<CutJobController>,
}

impl AppState {
    pub fn new(config: AudioConfig) -> Arc<Self> {
        let cuts = Arc::new(CutJobController::new(config));
        Arc::new(Self {
            start_time: Instant::now(),
            library: cuts.library().clone(),
            cuts,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
