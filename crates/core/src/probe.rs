// crates/core/src/probe.rs
//! Input length probe: `<tool> -hide_banner -i <input>` and read the `Duration:` banner.

use std::path::Path;
use std::time::Duration;

use crate::error::LaunchError;
use crate::launcher::{self, CommandSpec};
use crate::progress::parse_duration_marker;

/// Length of `input` in seconds, or `None` if the tool never announced one.
///
/// Without an output file the tool exits non-zero after printing the input
/// banner; that exit is expected and ignored. A probe that outlives `limit`
/// is killed and treated as "unknown".
pub async fn probe_duration(
    program: &str,
    input: &Path,
    limit: Duration,
) -> Result<Option<f64>, LaunchError> {
    let spec = CommandSpec::new(program)
        .args(["-hide_banner", "-nostdin", "-i"])
        .arg(input.to_string_lossy());
    let mut handle = launcher::spawn(&spec)?;

    let scan = async {
        while let Some(line) = handle.next_line().await {
            if let Some(secs) = parse_duration_marker(&line) {
                return Some(secs);
            }
        }
        None
    };
    let found = match tokio::time::timeout(limit, scan).await {
        Ok(found) => found,
        Err(_) => {
            tracing::warn!(
                input = %input.display(),
                timeout_secs = limit.as_secs_f64(),
                "duration probe timed out"
            );
            None
        }
    };

    if let Err(e) = handle.kill().await {
        tracing::debug!(error = %e, "duration probe: kill failed");
    }

    match found {
        Some(secs) => tracing::debug!(input = %input.display(), duration_secs = secs, "probed input duration"),
        None => tracing::info!(input = %input.display(), "input duration unknown"),
    }
    Ok(found)
}
