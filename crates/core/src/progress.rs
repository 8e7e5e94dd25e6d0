// crates/core/src/progress.rs
//! Progress signal extraction from the transcoding tool's text output.
//!
//! The tool reports progress as status lines such as
//! `size=     512kB time=00:01:23.45 bitrate= 50.2kbits/s speed=41.3x`
//! and announces the input length as `Duration: 00:03:10.27, start: ...`.
//! Only those two markers are interpreted; everything else is noise.

const TIME_MARKER: &str = "time=";
const DURATION_MARKER: &str = "Duration:";

/// Convert `HH:MM:SS(.ff)` into total seconds.
///
/// Returns `None` for anything that is not exactly three non-negative
/// colon-separated components (e.g. `N/A`, `-00:00:01.00`, `12:30`).
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let mut parts = raw.trim().split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.trim().parse().ok()?;
    let seconds: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Elapsed output time announced by a `time=` status line.
pub fn parse_time_marker(line: &str) -> Option<f64> {
    let rest = &line[line.find(TIME_MARKER)? + TIME_MARKER.len()..];
    let token = rest.split_whitespace().next()?;
    parse_timestamp(token)
}

/// Input length announced by the `Duration: ...,` banner line.
pub fn parse_duration_marker(line: &str) -> Option<f64> {
    let rest = &line[line.find(DURATION_MARKER)? + DURATION_MARKER.len()..];
    let token = rest.split(',').next()?;
    parse_timestamp(token)
}

/// How raw progress lines are turned into a percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressPolicy {
    /// True percentage of a known output length.
    Elapsed { total_secs: f64 },
    /// Coarse fallback: a fixed step per observed progress line.
    FixedStep { step: u8 },
}

impl ProgressPolicy {
    /// Pick `Elapsed` when the expected output length is positive,
    /// otherwise fall back to `FixedStep`.
    pub fn for_total(total_secs: Option<f64>, fallback_step: u8) -> Self {
        match total_secs {
            Some(total) if total.is_finite() && total > 0.0 => Self::Elapsed { total_secs: total },
            _ => Self::FixedStep {
                step: fallback_step.max(1),
            },
        }
    }
}

/// Highest value reported while the process is still running.
pub const RUNNING_CAP: u8 = 99;

/// Monotonic percentage for one job.
///
/// Never decreases, never reaches 100 before `finish()`.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    policy: ProgressPolicy,
    percent: u8,
}

impl ProgressTracker {
    pub fn new(policy: ProgressPolicy) -> Self {
        Self { policy, percent: 0 }
    }

    pub fn policy(&self) -> ProgressPolicy {
        self.policy
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Feed one output line. Returns the new percentage if it moved.
    pub fn observe_line(&mut self, line: &str) -> Option<u8> {
        let elapsed = parse_time_marker(line)?;
        let candidate = match self.policy {
            ProgressPolicy::Elapsed { total_secs } => {
                let ratio = (elapsed / total_secs).clamp(0.0, 1.0);
                (ratio * 100.0).floor() as u8
            }
            ProgressPolicy::FixedStep { step } => self.percent.saturating_add(step),
        };
        let next = candidate.min(RUNNING_CAP).max(self.percent);
        if next == self.percent {
            return None;
        }
        self.percent = next;
        Some(next)
    }

    /// The process exited successfully.
    pub fn finish(&mut self) -> u8 {
        self.percent = 100;
        self.percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:00.00"), Some(0.0));
        assert_eq!(parse_timestamp("01:02:03.50"), Some(3723.5));
        assert_eq!(parse_timestamp(" 00:00:30 "), Some(30.0));
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp("12:30"), None);
        assert_eq!(parse_timestamp("00:00:01:00"), None);
        assert_eq!(parse_timestamp("-00:00:01.00"), None);
        assert_eq!(parse_timestamp("aa:bb:cc"), None);
    }

    #[test]
    fn test_parse_time_marker_status_line() {
        let line = "size=     512kB time=00:01:23.45 bitrate=  50.2kbits/s speed=41.3x";
        let secs = parse_time_marker(line).unwrap();
        assert!((secs - 83.45).abs() < 1e-9);
    }

    #[test]
    fn test_parse_time_marker_without_marker_or_malformed() {
        assert_eq!(parse_time_marker("Stream #0:0: Audio: mp3, 44100 Hz"), None);
        assert_eq!(parse_time_marker("size=N/A time=N/A bitrate=N/A"), None);
        assert_eq!(parse_time_marker("time="), None);
        assert_eq!(parse_time_marker("time=00:0x:01.00 bitrate=1"), None);
    }

    #[test]
    fn test_parse_duration_marker() {
        let line = "  Duration: 00:03:10.27, start: 0.025057, bitrate: 128 kb/s";
        let secs = parse_duration_marker(line).unwrap();
        assert!((secs - 190.27).abs() < 1e-9);
        assert_eq!(parse_duration_marker("  Duration: N/A, bitrate: N/A"), None);
        assert_eq!(parse_duration_marker("time=00:00:01.00"), None);
    }

    #[test]
    fn test_policy_selection() {
        assert_eq!(
            ProgressPolicy::for_total(Some(30.0), 10),
            ProgressPolicy::Elapsed { total_secs: 30.0 }
        );
        assert_eq!(
            ProgressPolicy::for_total(Some(0.0), 10),
            ProgressPolicy::FixedStep { step: 10 }
        );
        assert_eq!(ProgressPolicy::for_total(None, 0), ProgressPolicy::FixedStep { step: 1 });
    }

    #[test]
    fn test_elapsed_tracker_is_monotonic_and_capped() {
        let mut tracker = ProgressTracker::new(ProgressPolicy::Elapsed { total_secs: 30.0 });
        assert_eq!(tracker.observe_line("time=00:00:03.00"), Some(10));
        assert_eq!(tracker.observe_line("time=00:00:15.00"), Some(50));
        // Out-of-order timestamps never move the percentage backwards.
        assert_eq!(tracker.observe_line("time=00:00:06.00"), None);
        assert_eq!(tracker.percent(), 50);
        assert_eq!(tracker.observe_line("time=00:00:30.00"), Some(RUNNING_CAP));
        assert_eq!(tracker.observe_line("time=00:01:00.00"), None);
        assert_eq!(tracker.observe_line("no marker here"), None);
        assert_eq!(tracker.finish(), 100);
    }

    #[test]
    fn test_fixed_step_tracker() {
        let mut tracker = ProgressTracker::new(ProgressPolicy::FixedStep { step: 10 });
        for expected in (10..=90).step_by(10) {
            assert_eq!(tracker.observe_line("time=00:00:01.00"), Some(expected as u8));
        }
        assert_eq!(tracker.observe_line("time=00:00:01.00"), Some(RUNNING_CAP));
        assert_eq!(tracker.observe_line("time=00:00:01.00"), None);
        // Lines without a progress signal do not count as a step.
        assert_eq!(tracker.observe_line("Press [q] to stop"), None);
    }
}
