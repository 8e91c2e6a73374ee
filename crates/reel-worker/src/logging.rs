//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for pipeline runs with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

use reel_models::{AudioSource, JobFailure, JobId, JobStatus};

/// Job logger for structured logging with consistent formatting.
///
/// Every message carries the job id and the operation being performed
/// (`pipeline`, `intake`, `admin`, ...).
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    /// Create a new job logger for a specific job and operation.
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of a job operation.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log a status change.
    pub fn log_transition(&self, from: JobStatus, to: JobStatus) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            from = %from,
            to = %to,
            "Job status: {} -> {}", from, to
        );
    }

    /// Log a stage finishing.
    pub fn log_stage(&self, stage: &str, elapsed_ms: u64) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage,
            elapsed_ms,
            "Stage finished: {}", stage
        );
    }

    /// Log narration falling back to substitute audio.
    pub fn log_audio_fallback(&self, source: AudioSource, reason: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            audio_source = %source,
            "Using fallback audio: {}", reason
        );
    }

    /// Log a warning during job execution.
    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    /// Log a job-fatal failure.
    pub fn log_failure(&self, failure: &JobFailure) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            kind = %failure.kind,
            "Job failed: {}", failure.detail
        );
    }

    /// Log an error that did not fail the job.
    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    /// Log the completion of a job operation.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}
