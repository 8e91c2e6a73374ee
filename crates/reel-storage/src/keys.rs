//! Object key and URL derivation.

use reel_models::JobId;

use crate::error::{StorageError, StorageResult};

/// Key prefix used when none is configured
pub const DEFAULT_KEY_PREFIX: &str = "bot_ai_vids";

/// Content type of uploaded reels
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Destination key for a job's reel: `{prefix}/videos/{job_id}.mp4`.
///
/// Depends only on the job id, so re-publishing overwrites the same object.
pub fn reel_object_key(prefix: &str, job_id: &JobId) -> StorageResult<String> {
    if !job_id.is_path_safe() {
        return Err(StorageError::InvalidKey(job_id.to_string()));
    }
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(format!("videos/{}.mp4", job_id))
    } else {
        Ok(format!("{}/videos/{}.mp4", prefix, job_id))
    }
}

/// Public URL of `key` under `base` (a CDN domain or `endpoint/bucket`).
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
