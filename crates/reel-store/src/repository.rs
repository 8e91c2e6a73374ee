//! Job repository abstraction.

use async_trait::async_trait;

use reel_models::{Job, JobId, JobStatus};

use crate::error::StoreResult;

/// Keyed storage for job records.
///
/// Implementations store whole records; status rules are enforced by the
/// caller before a record is written.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Store a new job. Fails with `AlreadyExists` when the id is taken.
    async fn insert(&self, job: &Job) -> StoreResult<()>;

    /// Fetch a job by id.
    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>>;

    /// Create or replace a job record.
    async fn upsert(&self, job: &Job) -> StoreResult<()>;

    /// Remove a job record. Returns whether a record existed.
    async fn delete(&self, id: &JobId) -> StoreResult<bool>;

    /// All jobs currently in `status`, in no particular order.
    async fn list_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>>;
}
