//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions for HTTP requests and cut jobs
//! - Helper functions for recording metrics

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("api_requests_total", "Total number of API requests");
    describe_histogram!(
        "api_request_duration_seconds",
        "Duration of API requests in seconds"
    );

    describe_counter!("cut_jobs_started_total", "Cut jobs that launched the tool");
    describe_counter!(
        "cut_jobs_finished_total",
        "Cut jobs that reached a terminal state, by outcome"
    );
    describe_histogram!(
        "cut_job_duration_seconds",
        "Wall time from launch to terminal state, pauses included"
    );
    describe_gauge!("cut_job_progress_percent", "Percent complete of the current cut job");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record a completed API request.
pub fn record_request(endpoint: &str, status: &str, duration: Duration) {
    counter!("api_requests_total", "endpoint" => endpoint.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("api_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_cut_started() {
    counter!("cut_jobs_started_total").increment(1);
    gauge!("cut_job_progress_percent").set(0.0);
}

/// Record a cut job's terminal state.
///
/// # Arguments
/// * `outcome` - "completed", "cancelled" or "failed"
/// * `duration` - wall time since launch
pub fn record_cut_finished(outcome: &str, duration: Duration) {
    counter!("cut_jobs_finished_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("cut_job_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
    if outcome == "completed" {
        gauge!("cut_job_progress_percent").set(100.0);
    }
}

pub fn record_cut_progress(percent: u8) {
    gauge!("cut_job_progress_percent").set(f64::from(percent));
}

/// Helper for timing request handlers.
///
/// Usage:
/// ```ignore
/// let timer = RequestTimer::new("cut_start");
/// // ... do work ...
/// timer.finish_ok(); // or timer.finish_err(status_code)
/// ```
pub struct RequestTimer {
    endpoint: &'static str,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }

    pub fn finish_ok(self) {
        record_request(self.endpoint, "200", self.start.elapsed());
    }

    pub fn finish_err(self, status: u16) {
        record_request(self.endpoint, &status.to_string(), self.start.elapsed());
    }
}
