// crates/core/src/config.rs
//! Runtime configuration for the library and the cut job controller.

use std::path::PathBuf;

use crate::paths;

/// Where audio lives, where cuts go, and how the transcoding tool is run.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Root of uploaded audio. Subdirectories are collections.
    pub library_dir: PathBuf,
    /// Root of produced cuts, grouped by date folder.
    pub output_dir: PathBuf,
    /// Transcoding tool binary (name on PATH or absolute path).
    pub ffmpeg_path: String,
    /// Probe the input's length before cutting so progress is a true percentage.
    pub probe_duration: bool,
    pub probe_timeout_secs: u64,
    /// Percent added per progress line when no total length is known.
    pub fixed_step_percent: u8,
}

impl AudioConfig {
    pub fn new(library_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn with_probe(mut self, enabled: bool) -> Self {
        self.probe_duration = enabled;
        self
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        let fallback = PathBuf::from("audiocut-data");
        Self {
            library_dir: paths::default_library_dir().unwrap_or_else(|| fallback.join("library")),
            output_dir: paths::default_output_dir().unwrap_or_else(|| fallback.join("cuts")),
            ffmpeg_path: "ffmpeg".into(),
            probe_duration: true,
            probe_timeout_secs: 10,
            fixed_step_percent: 10,
        }
    }
}
