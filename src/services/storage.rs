use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use std::path::Path;
use std::time::Duration;

/// Longest validity S3-style presigning accepts (7 days).
const MAX_PRESIGN_SECS: u64 = 7 * 24 * 60 * 60;

/// Blob store used by the cut worker and the progress query.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream the object at `key` into a local file at `dest`.
    async fn download(&self, key: &str, dest: &Path) -> Result<(), StorageError>;

    /// Stream the local file at `src` to `key`.
    async fn upload(&self, key: &str, src: &Path) -> Result<(), StorageError>;

    /// Time-limited GET link for `key`.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Client for Cloudflare R2 object storage (S3-compatible).
pub struct R2Client {
    bucket: Box<Bucket>,
}

impl R2Client {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials =
            Credentials::new(Some(access_key), Some(secret_key), None, None, None)
                .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?
            .with_path_style();

        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn download(&self, key: &str, dest: &Path) -> Result<(), StorageError> {
        let mut file = tokio::fs::File::create(dest).await?;
        let status = self
            .bucket
            .get_object_to_writer(key, &mut file)
            .await
            .map_err(StorageError::S3)?;

        check_status(key, status)?;
        file.sync_all().await?;
        tracing::debug!(key, path = %dest.display(), "Downloaded object");
        Ok(())
    }

    async fn upload(&self, key: &str, src: &Path) -> Result<(), StorageError> {
        let mut file = tokio::fs::File::open(src).await?;
        let response = self
            .bucket
            .put_object_stream(&mut file, key)
            .await
            .map_err(StorageError::S3)?;
        // Covers the final request only: the single PUT, or the multipart completion.
        check_status(key, response.status_code())?;
        tracing::debug!(key, path = %src.display(), bytes = response.uploaded_bytes(), "Uploaded object");
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let secs = ttl.as_secs().clamp(1, MAX_PRESIGN_SECS) as u32;
        self.bucket
            .presign_get(key, secs, None)
            .await
            .map_err(StorageError::S3)
    }
}

fn check_status(key: &str, code: u16) -> Result<(), StorageError> {
    match code {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        code => Err(StorageError::Status {
            key: key.to_string(),
            code,
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] s3::error::S3Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Unexpected status {code} for object {key}")]
    Status { key: String, code: u16 },

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage configuration error: {0}")]
    Config(String),
}
