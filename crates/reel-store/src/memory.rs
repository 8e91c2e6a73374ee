//! In-memory job repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use reel_models::{Job, JobId, JobStatus};

use crate::error::{StoreError, StoreResult};
use crate::repository::JobRepository;

/// Job records held in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn insert(&self, job: &Job) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::already_exists(&job.id));
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn upsert(&self, job: &Job) -> StoreResult<()> {
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn delete(&self, id: &JobId) -> StoreResult<bool> {
        Ok(self.jobs.write().await.remove(id).is_some())
    }

    async fn list_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.status == status)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> Job {
        Job::new(JobId::from(id), None, "text", vec!["a.jpg".into()], 1)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let repo = MemoryJobRepository::new();
        repo.insert(&job("j1")).await.unwrap();
        let err = repo.insert(&job("j1")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_and_list_by_status() {
        let repo = MemoryJobRepository::new();
        let mut a = job("a");
        repo.insert(&a).await.unwrap();
        repo.insert(&job("b")).await.unwrap();

        a.advance(JobStatus::Synthesizing, None).unwrap();
        repo.upsert(&a).await.unwrap();

        let pending = repo.list_by_status(JobStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.as_str(), "b");

        let synth = repo.list_by_status(JobStatus::Synthesizing).await.unwrap();
        assert_eq!(synth.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = MemoryJobRepository::new();
        repo.insert(&job("gone")).await.unwrap();
        assert!(repo.delete(&JobId::from("gone")).await.unwrap());
        assert!(!repo.delete(&JobId::from("gone")).await.unwrap());
        assert!(repo.get(&JobId::from("gone")).await.unwrap().is_none());
    }
}
