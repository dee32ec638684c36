//! S3-compatible blob store client: read-only fetch of an uploaded video by `_id`.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{BlobError, BlobResult};

/// Blob store configuration.
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
}

impl BlobStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> BlobResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("BLOBSTORE_ENDPOINT_URL")
                .map_err(|_| BlobError::config("BLOBSTORE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("BLOBSTORE_ACCESS_KEY_ID")
                .map_err(|_| BlobError::config("BLOBSTORE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("BLOBSTORE_SECRET_ACCESS_KEY")
                .map_err(|_| BlobError::config("BLOBSTORE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("BLOBSTORE_BUCKET_NAME")
                .map_err(|_| BlobError::config("BLOBSTORE_BUCKET_NAME not set"))?,
            region: std::env::var("BLOBSTORE_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// Read-only client for the blob store holding uploaded video files.
///
/// The tracking core never writes to this store; the uploader owns that path.
#[derive(Clone)]
pub struct BlobStoreClient {
    client: Client,
    bucket: String,
}

impl BlobStoreClient {
    pub async fn new(config: BlobStoreConfig) -> BlobResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "vtrack-blobstore",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
        })
    }

    pub async fn from_env() -> BlobResult<Self> {
        Self::new(BlobStoreConfig::from_env()?).await
    }

    /// Fetch the encoded video blob for a job `_id` (bucket key == job id) and
    /// write it to `dest`. The container format is left to the decoder.
    pub async fn download_to_path(&self, key: &str, dest: impl AsRef<Path>) -> BlobResult<()> {
        let dest = dest.as_ref();
        debug!(key, dest = %dest.display(), "downloading blob");

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_no_such_key() => BlobError::NotFound(key.to_string()),
                _ => BlobError::download_failed(e.to_string()),
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| BlobError::download_failed(e.to_string()))?
            .into_bytes();

        tokio::fs::write(dest, &data).await?;

        info!(key, bytes = data.len(), "downloaded blob");
        Ok(())
    }
}
