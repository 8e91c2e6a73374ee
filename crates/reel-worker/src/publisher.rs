//! Publishing finished reels to object storage.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use reel_media::fs_utils::remove_files_except;
use reel_media::Workspace;
use reel_models::{JobId, PublishedRef};
use reel_storage::{reel_object_key, ObjectStore, StorageError, VIDEO_CONTENT_TYPE};

use crate::logging::JobLogger;
use crate::metrics;
use crate::retry::{RetryResult, StagePolicy};

/// Uploads reels and reclaims local space once they are durable.
pub struct ArtifactPublisher {
    store: Option<Arc<dyn ObjectStore>>,
    key_prefix: String,
    policy: StagePolicy,
    workspace: Workspace,
}

impl ArtifactPublisher {
    /// `store` is `None` when object storage is not configured; every reel
    /// then stays local.
    pub fn new(
        store: Option<Arc<dyn ObjectStore>>,
        key_prefix: impl Into<String>,
        policy: StagePolicy,
        workspace: Workspace,
    ) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            policy,
            workspace,
        }
    }

    pub fn object_key(&self, job_id: &JobId) -> Option<String> {
        reel_object_key(&self.key_prefix, job_id).ok()
    }

    /// Publish the reel at `video_path` for `job_id`.
    ///
    /// Returns the remote reference on success and the local path otherwise.
    /// Safe to call again after a crash: when the local file is gone but the
    /// object already exists remotely, the remote reference is returned
    /// without uploading.
    pub async fn publish(&self, video_path: &Path, job_id: &JobId) -> PublishedRef {
        let logger = JobLogger::new(job_id, "publish");
        let local = PublishedRef::Local {
            path: video_path.to_path_buf(),
        };

        let Some(store) = self.store.as_ref() else {
            debug!(job_id = %job_id, "Object storage not configured, keeping reel local");
            return local;
        };

        let key = match reel_object_key(&self.key_prefix, job_id) {
            Ok(key) => key,
            Err(e) => {
                logger.log_error(&format!("no destination key: {}", e));
                metrics::record_publish_fallback();
                return local;
            }
        };

        if !video_path.is_file() {
            return match store.exists(&key).await {
                Ok(true) => {
                    info!(job_id = %job_id, "Reel already published as {}", key);
                    PublishedRef::Remote {
                        url: store.public_url(&key),
                        key,
                    }
                }
                Ok(false) => {
                    logger.log_warning("reel is missing locally and remotely");
                    local
                }
                Err(e) => {
                    logger.log_warning(&format!("checking remote copy failed: {}", e));
                    local
                }
            };
        }

        let result = self
            .policy
            .run(
                || store.upload_file(video_path, &key, VIDEO_CONTENT_TYPE),
                |e: &StorageError| e.is_retryable(),
            )
            .await;

        match result {
            RetryResult::Success(()) => {
                self.reclaim(job_id, &logger).await;
                PublishedRef::Remote {
                    url: store.public_url(&key),
                    key,
                }
            }
            RetryResult::Failed { error, attempts } => {
                logger.log_warning(&format!(
                    "upload failed after {} attempt(s), keeping local copy: {}",
                    attempts, error
                ));
                metrics::record_publish_fallback();
                local
            }
        }
    }

    /// Delete everything in the namespace except `*.txt` metadata.
    async fn reclaim(&self, job_id: &JobId, logger: &JobLogger) {
        let ns = match self.workspace.namespace(job_id) {
            Ok(ns) => ns,
            Err(e) => {
                logger.log_warning(&format!("skipping cleanup: {}", e));
                return;
            }
        };

        match remove_files_except(ns.dir(), is_metadata).await {
            Ok(removed) => debug!(
                job_id = %job_id,
                "Reclaimed {} local file(s) after publish",
                removed.len()
            ),
            Err(e) => logger.log_warning(&format!("cleanup after publish failed: {}", e)),
        }
    }
}

fn is_metadata(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("txt")
}
