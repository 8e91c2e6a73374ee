//! Job status tracking.
//!
//! All status changes go through [`JobStatusTracker`], which enforces the
//! lifecycle rules before a record is persisted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use reel_models::{AudioSource, Job, JobFailure, JobId, JobStatus, VideoInfo};
use reel_store::JobRepository;

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Reads and mutates job records on behalf of the pipeline.
#[derive(Clone)]
pub struct JobStatusTracker {
    repo: Arc<dyn JobRepository>,
}

impl JobStatusTracker {
    pub fn new(repo: Arc<dyn JobRepository>) -> Self {
        Self { repo }
    }

    /// Persist a new pending job. Duplicate ids are rejected.
    pub async fn create(&self, job: &Job) -> WorkerResult<()> {
        if job.status != JobStatus::Pending {
            return Err(WorkerError::validation(format!(
                "new jobs must be pending, got {}",
                job.status
            )));
        }
        self.repo.insert(job).await?;
        Ok(())
    }

    pub async fn get(&self, job_id: &JobId) -> WorkerResult<Job> {
        self.repo
            .get(job_id)
            .await?
            .ok_or_else(|| WorkerError::not_found(job_id))
    }

    pub async fn exists(&self, job_id: &JobId) -> WorkerResult<bool> {
        Ok(self.repo.get(job_id).await?.is_some())
    }

    /// Move a job to `status`. `artifact_ref` must be given exactly when
    /// completing.
    pub async fn advance(
        &self,
        job_id: &JobId,
        status: JobStatus,
        artifact_ref: Option<String>,
    ) -> WorkerResult<Job> {
        let mut job = self.get(job_id).await?;
        let from = job.status;
        job.advance(status, artifact_ref)?;
        self.repo.upsert(&job).await?;
        JobLogger::new(job_id, "status").log_transition(from, job.status);
        Ok(job)
    }

    /// Move a job to `failed` with diagnostic detail.
    pub async fn fail(&self, job_id: &JobId, failure: JobFailure) -> WorkerResult<Job> {
        let mut job = self.get(job_id).await?;
        let from = job.status;
        job.fail(failure)?;
        self.repo.upsert(&job).await?;
        JobLogger::new(job_id, "status").log_transition(from, JobStatus::Failed);
        Ok(job)
    }

    pub async fn record_audio_source(
        &self,
        job_id: &JobId,
        source: AudioSource,
    ) -> WorkerResult<Job> {
        let mut job = self.get(job_id).await?;
        job.audio_source = Some(source);
        self.repo.upsert(&job).await?;
        Ok(job)
    }

    pub async fn record_video_info(&self, job_id: &JobId, info: VideoInfo) -> WorkerResult<Job> {
        let mut job = self.get(job_id).await?;
        job.video = Some(info);
        self.repo.upsert(&job).await?;
        Ok(job)
    }

    /// Completed jobs, most recently finished first.
    pub async fn gallery(&self, limit: usize) -> WorkerResult<Vec<Job>> {
        self.newest(JobStatus::Completed, limit).await
    }

    /// Failed jobs with their failure detail, most recent first.
    pub async fn failures(&self, limit: usize) -> WorkerResult<Vec<Job>> {
        self.newest(JobStatus::Failed, limit).await
    }

    async fn newest(&self, status: JobStatus, limit: usize) -> WorkerResult<Vec<Job>> {
        let mut jobs = self.repo.list_by_status(status).await?;
        jobs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        jobs.truncate(limit);
        Ok(jobs)
    }

    /// Jobs the poll loop should pick up: every pending job plus in-flight
    /// jobs not touched for `stale_after`. Oldest first.
    pub async fn pending_or_stale(&self, stale_after: Duration) -> WorkerResult<Vec<Job>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(stale_after).unwrap_or_else(|_| chrono::Duration::zero());

        let mut jobs = self.repo.list_by_status(JobStatus::Pending).await?;
        for status in JobStatus::ALL.into_iter().filter(JobStatus::is_in_flight) {
            let stale = self
                .repo
                .list_by_status(status)
                .await?
                .into_iter()
                .filter(|job| job.updated_at <= cutoff);
            jobs.extend(stale);
        }

        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        debug!("{} job(s) ready for processing", jobs.len());
        Ok(jobs)
    }

    /// Remove a job record. Returns whether it existed.
    pub async fn delete(&self, job_id: &JobId) -> WorkerResult<bool> {
        Ok(self.repo.delete(job_id).await?)
    }
}
