use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::cutter::CutterConfig;
use crate::services::progress::PresignPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Prometheus scrape listener of the worker process
    #[serde(default = "default_worker_metrics_addr")]
    pub worker_metrics_addr: SocketAddr,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for the cut-job queue
    pub redis_url: String,

    /// R2 bucket name
    pub r2_bucket: String,

    /// R2 access key ID (S3-compatible)
    pub r2_access_key: String,

    /// R2 secret access key (S3-compatible)
    pub r2_secret_key: String,

    /// R2 endpoint URL
    pub r2_endpoint: String,

    /// Container extension for produced clips
    #[serde(default = "default_clip_ext")]
    pub clip_ext: String,

    /// Target clip length handed to the segmenter
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,

    /// Validity window of issued download links (48h)
    #[serde(default = "default_presign_ttl_secs")]
    pub presign_ttl_secs: u64,

    #[serde(default = "default_presign_timeout_secs")]
    pub presign_timeout_secs: u64,

    /// Upper bound on concurrent link requests within one progress query
    #[serde(default = "default_presign_concurrency")]
    pub presign_concurrency: usize,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_segment_timeout_secs")]
    pub segment_timeout_secs: u64,

    /// Deadline for the downloaded source to become visible on disk
    #[serde(default = "default_file_wait_timeout_secs")]
    pub file_wait_timeout_secs: u64,

    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,

    /// Deliveries of a cut job before it is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Root under which each cut job gets its own scratch directory
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_worker_metrics_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9100))
}

fn default_clip_ext() -> String {
    "mkv".to_string()
}

fn default_segment_seconds() -> u32 {
    60
}

fn default_presign_ttl_secs() -> u64 {
    48 * 60 * 60
}

fn default_presign_timeout_secs() -> u64 {
    10
}

fn default_presign_concurrency() -> usize {
    16
}

fn default_download_timeout_secs() -> u64 {
    30 * 60
}

fn default_segment_timeout_secs() -> u64 {
    60 * 60
}

fn default_file_wait_timeout_secs() -> u64 {
    30
}

fn default_upload_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn presign_policy(&self) -> PresignPolicy {
        PresignPolicy {
            ttl: Duration::from_secs(self.presign_ttl_secs),
            timeout: Duration::from_secs(self.presign_timeout_secs),
            concurrency: self.presign_concurrency.max(1),
        }
    }

    pub fn cutter_config(&self) -> CutterConfig {
        CutterConfig {
            clip_ext: self.clip_ext.trim_start_matches('.').to_string(),
            scratch_root: self.scratch_dir.clone(),
            download_timeout: Duration::from_secs(self.download_timeout_secs),
            segment_timeout: Duration::from_secs(self.segment_timeout_secs),
            file_wait_timeout: Duration::from_secs(self.file_wait_timeout_secs),
            upload_concurrency: self.upload_concurrency.max(1),
        }
    }
}
