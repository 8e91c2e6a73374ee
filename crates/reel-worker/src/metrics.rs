//! Prometheus metrics for the pipeline worker.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with an HTTP scrape listener on `port`.
pub fn init_metrics(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Metric names as constants for consistency.
pub mod names {
    // Job outcomes
    pub const JOBS_SUBMITTED_TOTAL: &str = "reel_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "reel_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "reel_jobs_failed_total";

    // Fallbacks
    pub const AUDIO_FALLBACK_TOTAL: &str = "reel_audio_fallback_total";
    pub const PUBLISH_FALLBACK_TOTAL: &str = "reel_publish_fallback_total";

    // Timing
    pub const STAGE_DURATION_SECONDS: &str = "reel_stage_duration_seconds";
}

/// Record a job accepted by intake.
pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

/// Record job completed. `remote` is false when the reel stayed local.
pub fn record_job_completed(remote: bool) {
    let labels = [("published", if remote { "remote" } else { "local" }.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record job failed.
pub fn record_job_failed(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record narration replaced by substitute audio.
pub fn record_audio_fallback(source: &str) {
    let labels = [("source", source.to_string())];
    counter!(names::AUDIO_FALLBACK_TOTAL, &labels).increment(1);
}

/// Record an upload that gave up and kept the local copy.
pub fn record_publish_fallback() {
    counter!(names::PUBLISH_FALLBACK_TOTAL).increment(1);
}

/// Record how long a pipeline stage took.
pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}
