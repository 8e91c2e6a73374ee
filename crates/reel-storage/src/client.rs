//! R2 client implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::keys::{public_url, DEFAULT_KEY_PREFIX};
use crate::object_store::ObjectStore;

/// Configuration for R2 client.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public base URL (custom domain); falls back to `endpoint/bucket`
    pub public_url: Option<String>,
    /// Prefix for reel object keys
    pub key_prefix: String,
    /// Timeout for a single storage operation
    pub operation_timeout: Duration,
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("R2_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("R2_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("R2_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("R2_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("R2_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("R2_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("R2_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("R2_BUCKET_NAME not set"))?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_url: std::env::var("R2_PUBLIC_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            key_prefix: std::env::var("R2_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
            operation_timeout: Duration::from_secs(
                std::env::var("R2_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        })
    }

    /// Base URL objects are publicly served from.
    pub fn public_base(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "{}/{}",
                self.endpoint_url.trim_end_matches('/'),
                self.bucket_name
            ),
        }
    }
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    public_base: String,
}

impl R2Client {
    /// Create a new R2 client from configuration.
    pub async fn new(config: R2Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.operation_timeout)
            .build();

        let public_base = config.public_base();

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .timeout_config(timeouts)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(sdk_config);

        Ok(Self {
            client,
            bucket: config.bucket_name,
            public_base,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = R2Config::from_env()?;
        Self::new(config).await
    }

    /// Check connectivity to R2 by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn upload_file(&self, path: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found || e.to_string().contains("NotFound") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        public_url(&self.public_base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> R2Config {
        R2Config {
            endpoint_url: "https://acct.r2.cloudflarestorage.com/".into(),
            access_key_id: "id".into(),
            secret_access_key: "secret".into(),
            bucket_name: "reels".into(),
            region: "auto".into(),
            public_url: None,
            key_prefix: DEFAULT_KEY_PREFIX.into(),
            operation_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_public_base_falls_back_to_bucket_path() {
        assert_eq!(
            config().public_base(),
            "https://acct.r2.cloudflarestorage.com/reels"
        );

        let with_cdn = R2Config {
            public_url: Some("https://cdn.example.com/".into()),
            ..config()
        };
        assert_eq!(with_cdn.public_base(), "https://cdn.example.com");
    }

    #[tokio::test]
    async fn test_client_public_url() {
        let client = R2Client::new(R2Config {
            public_url: Some("https://cdn.example.com".into()),
            ..config()
        })
        .await
        .unwrap();
        assert_eq!(
            client.public_url("bot_ai_vids/videos/j.mp4"),
            "https://cdn.example.com/bot_ai_vids/videos/j.mp4"
        );
    }

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_upload_exists_delete_roundtrip() {
        let client = R2Client::from_env().await.unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reel.mp4");
        tokio::fs::write(&path, b"not really a video").await.unwrap();

        let key = "test/videos/roundtrip.mp4";
        client.upload_file(&path, key, "video/mp4").await.unwrap();
        assert!(client.exists(key).await.unwrap());
        client.delete_object(key).await.unwrap();
        assert!(!client.exists(key).await.unwrap());
    }
}
