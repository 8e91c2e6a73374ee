//! Redis-backed job repository.
//!
//! Each job is a JSON string at `{prefix}:job:{id}`. A set per status
//! (`{prefix}:status:{status}`) indexes ids for the poll loop and gallery.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, warn};

use reel_models::{Job, JobId, JobStatus};

use crate::error::{StoreError, StoreResult};
use crate::repository::JobRepository;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Prefix for every key written by the store
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "reel".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("STORE_KEY_PREFIX").unwrap_or_else(|_| "reel".to_string()),
        }
    }
}

/// Job repository client.
pub struct RedisJobRepository {
    client: redis::Client,
    config: StoreConfig,
}

impl RedisJobRepository {
    /// Create a new repository client.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StoreConfig::from_env())
    }

    /// Verify the server is reachable.
    pub async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    fn job_key(&self, id: &JobId) -> String {
        format!("{}:job:{}", self.config.key_prefix, id)
    }

    fn status_key(&self, status: JobStatus) -> String {
        format!("{}:status:{}", self.config.key_prefix, status.as_str())
    }

    async fn connection(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))
    }

    /// Atomically point the status index at `job.status`.
    fn index_pipeline(&self, job: &Job) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for status in JobStatus::ALL {
            if status != job.status {
                pipe.srem(self.status_key(status), job.id.as_str()).ignore();
            }
        }
        pipe.sadd(self.status_key(job.status), job.id.as_str())
            .ignore();
        pipe
    }
}

#[async_trait]
impl JobRepository for RedisJobRepository {
    async fn insert(&self, job: &Job) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job)?;

        let created: Option<String> = redis::cmd("SET")
            .arg(self.job_key(&job.id))
            .arg(&payload)
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        if created.is_none() {
            warn!("Duplicate job id rejected: {}", job.id);
            return Err(StoreError::already_exists(&job.id));
        }

        self.index_pipeline(job)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Inserted job {}", job.id);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(self.job_key(id)).await?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, job: &Job) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job)?;

        let mut pipe = self.index_pipeline(job);
        pipe.set(self.job_key(&job.id), payload).ignore();
        pipe.query_async::<()>(&mut conn).await?;

        debug!("Stored job {} ({})", job.id, job.status);
        Ok(())
    }

    async fn delete(&self, id: &JobId) -> StoreResult<bool> {
        let mut conn = self.connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(self.job_key(id));
        for status in JobStatus::ALL {
            pipe.srem(self.status_key(status), id.as_str()).ignore();
        }
        let (removed,): (u64,) = pipe.query_async(&mut conn).await?;

        Ok(removed > 0)
    }

    async fn list_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let mut conn = self.connection().await?;
        let set_key = self.status_key(status);

        let ids: Vec<String> = conn.smembers(&set_key).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids
            .iter()
            .map(|id| self.job_key(&JobId::from_string(id.clone())))
            .collect();
        let payloads: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::with_capacity(payloads.len());
        for (id, payload) in ids.iter().zip(payloads) {
            let Some(json) = payload else {
                // Record deleted between SMEMBERS and MGET
                let _: Result<(), _> = conn.srem(&set_key, id).await;
                continue;
            };
            match serde_json::from_str::<Job>(&json) {
                Ok(job) if job.status == status => jobs.push(job),
                Ok(_) => debug!("Status index for {} is stale", id),
                Err(e) => warn!("Failed to parse job {}: {}", id, e),
            }
        }

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_with_prefix(prefix: &str) -> RedisJobRepository {
        RedisJobRepository::new(StoreConfig {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: prefix.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_key_layout() {
        let repo = repo_with_prefix("reel");
        assert_eq!(repo.job_key(&JobId::from("abc")), "reel:job:abc");
        assert_eq!(repo.status_key(JobStatus::Completed), "reel:status:completed");
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_redis_roundtrip() {
        let prefix = format!("reel-test-{}", JobId::new());
        let repo = repo_with_prefix(&prefix);
        repo.ping().await.unwrap();

        let mut job = Job::new(JobId::new(), None, "Hello", vec!["a.jpg".into()], 2);
        repo.insert(&job).await.unwrap();
        assert!(matches!(
            repo.insert(&job).await,
            Err(StoreError::AlreadyExists(_))
        ));

        job.advance(JobStatus::Synthesizing, None).unwrap();
        repo.upsert(&job).await.unwrap();
        assert!(repo
            .list_by_status(JobStatus::Pending)
            .await
            .unwrap()
            .is_empty());
        let in_flight = repo.list_by_status(JobStatus::Synthesizing).await.unwrap();
        assert_eq!(in_flight.len(), 1);

        let loaded = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Synthesizing);

        assert!(repo.delete(&job.id).await.unwrap());
        assert!(repo.get(&job.id).await.unwrap().is_none());
    }
}
