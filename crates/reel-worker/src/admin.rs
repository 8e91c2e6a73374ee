//! Gallery and operator queries, and explicit job deletion.

use std::sync::Arc;

use tracing::info;

use reel_media::Workspace;
use reel_models::{Job, JobId};
use reel_storage::{reel_object_key, ObjectStore};

use crate::error::WorkerResult;
use crate::tracker::JobStatusTracker;

/// Read side of the pipeline plus the one destructive admin action.
pub struct AdminService {
    tracker: JobStatusTracker,
    workspace: Workspace,
    store: Option<Arc<dyn ObjectStore>>,
    key_prefix: String,
}

impl AdminService {
    pub fn new(
        tracker: JobStatusTracker,
        workspace: Workspace,
        store: Option<Arc<dyn ObjectStore>>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            workspace,
            store,
            key_prefix: key_prefix.into(),
        }
    }

    /// Completed reels, newest first.
    pub async fn gallery(&self, limit: usize) -> WorkerResult<Vec<Job>> {
        self.tracker.gallery(limit).await
    }

    /// Failed jobs with their diagnostic detail, newest first.
    pub async fn failures(&self, limit: usize) -> WorkerResult<Vec<Job>> {
        self.tracker.failures(limit).await
    }

    /// Delete a job: remote object, local namespace, then the record.
    ///
    /// The record goes last so a partially failed deletion can be retried.
    pub async fn delete_job(&self, job_id: &JobId) -> WorkerResult<()> {
        let job = self.tracker.get(job_id).await?;

        if let Some(store) = &self.store {
            let key = reel_object_key(&self.key_prefix, &job.id)?;
            store.delete_object(&key).await?;
        }

        self.workspace.namespace(&job.id)?.remove().await?;
        self.tracker.delete(&job.id).await?;

        info!(job_id = %job_id, status = %job.status, "Deleted job");
        Ok(())
    }
}
