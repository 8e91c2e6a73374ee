//! Object storage abstraction.

use async_trait::async_trait;
use std::path::Path;

use crate::error::StorageResult;

/// Durable storage for finished reels.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file to `key`, replacing any existing object.
    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()>;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete the object at `key`. Deleting a missing object succeeds.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Stable public URL for `key`.
    fn public_url(&self, key: &str) -> String;
}
