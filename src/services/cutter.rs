//! Turns one source video into registered clip artifacts.
//!
//! Each clip is uploaded and registered independently: a failure on one clip
//! is logged and does not stop its siblings. Registration is keyed by
//! `(video_key, clip_key)`, so a redelivered job skips clips a previous
//! delivery already finished.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, timeout, Instant};

use crate::db::ClipRegistry;
use crate::models::clip::VideoClip;
use crate::models::job::CutJob;
use crate::services::segment::{SegmentError, Segmenter};
use crate::services::storage::{ObjectStore, StorageError};

const FILE_WAIT_INITIAL_DELAY: Duration = Duration::from_millis(100);
const FILE_WAIT_MAX_DELAY: Duration = Duration::from_secs(2);

/// Register descriptions of the metrics a cutter emits with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!("cut_jobs_total", "Cut job deliveries handled");
    metrics::describe_counter!("cut_jobs_failed", "Cut job deliveries that ended in an error");
    metrics::describe_histogram!("cut_job_seconds", "Wall time of one cut job delivery");
    metrics::describe_counter!("clips_uploaded_total", "Clips uploaded and registered");
    metrics::describe_counter!("clips_skipped_total", "Clips found already registered");
    metrics::describe_counter!("clips_failed_total", "Clips that failed to upload or register");
}

#[derive(Debug, Clone)]
pub struct CutterConfig {
    /// Container extension of produced clips, without the dot.
    pub clip_ext: String,
    pub scratch_root: PathBuf,
    pub download_timeout: Duration,
    pub segment_timeout: Duration,
    pub file_wait_timeout: Duration,
    pub upload_concurrency: usize,
}

/// Per-clip counts of one cut run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CutReport {
    pub total: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CutReport {
    fn record(&mut self, outcome: ClipOutcome) {
        match outcome {
            ClipOutcome::Uploaded => self.uploaded += 1,
            ClipOutcome::Skipped => self.skipped += 1,
            ClipOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipOutcome {
    Uploaded,
    Skipped,
    Failed,
}

pub struct ClipCutter {
    store: Arc<dyn ObjectStore>,
    registry: Arc<dyn ClipRegistry>,
    segmenter: Arc<dyn Segmenter>,
    config: CutterConfig,
}

impl ClipCutter {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        registry: Arc<dyn ClipRegistry>,
        segmenter: Arc<dyn Segmenter>,
        config: CutterConfig,
    ) -> Self {
        Self {
            store,
            registry,
            segmenter,
            config,
        }
    }

    /// Handle one queue delivery. `Ok` acknowledges the job; any error asks
    /// the queue for another delivery, including runs where some clips failed.
    pub async fn handle(&self, job: &CutJob) -> Result<CutReport, CutError> {
        let start = Instant::now();
        metrics::counter!("cut_jobs_total").increment(1);

        let result = self.cut(&job.video_key).await.and_then(|report| {
            if report.failed > 0 {
                Err(CutError::Incomplete {
                    failed: report.failed,
                    total: report.total,
                })
            } else {
                Ok(report)
            }
        });

        metrics::histogram!("cut_job_seconds").record(start.elapsed().as_secs_f64());
        if result.is_err() {
            metrics::counter!("cut_jobs_failed").increment(1);
        }
        result
    }

    /// Download, segment and persist every clip of `video_key`.
    pub async fn cut(&self, video_key: &str) -> Result<CutReport, CutError> {
        let scratch = self.scratch_dir()?;
        tracing::info!(video_key, scratch = %scratch.path().display(), "Processing cut job");

        let result = self.cut_in(video_key, scratch.path()).await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(
                video_key,
                scratch = %scratch_path.display(),
                error = %e,
                "Failed to remove scratch directory"
            );
        }

        result
    }

    fn scratch_dir(&self) -> Result<TempDir, CutError> {
        std::fs::create_dir_all(&self.config.scratch_root).map_err(CutError::Scratch)?;
        tempfile::Builder::new()
            .prefix("clipline-cut-")
            .tempdir_in(&self.config.scratch_root)
            .map_err(CutError::Scratch)
    }

    async fn cut_in(&self, video_key: &str, scratch: &Path) -> Result<CutReport, CutError> {
        let source = scratch.join(source_file_name(video_key));

        timeout(self.config.download_timeout, self.store.download(video_key, &source))
            .await
            .map_err(|_| CutError::Timeout {
                stage: "download",
                after: self.config.download_timeout,
            })?
            .map_err(|e| CutError::Download {
                key: video_key.to_string(),
                source: e,
            })?;

        wait_for_file(&source, self.config.file_wait_timeout).await?;
        tracing::info!(video_key, "Source downloaded");

        let clips_dir = scratch.join("clips");
        let clips = timeout(
            self.config.segment_timeout,
            self.segmenter.cut(&source, &clips_dir),
        )
        .await
        .map_err(|_| CutError::Timeout {
            stage: "segmentation",
            after: self.config.segment_timeout,
        })??;

        let total = clips.len();
        tracing::info!(video_key, total, "Source segmented");

        let outcomes: Vec<ClipOutcome> = stream::iter(clips.into_iter().enumerate())
            .map(|(index, path)| self.persist_clip(video_key, index, total, path))
            .buffer_unordered(self.config.upload_concurrency.max(1))
            .collect()
            .await;

        let mut report = CutReport {
            total,
            ..CutReport::default()
        };
        for outcome in outcomes {
            report.record(outcome);
        }

        tracing::info!(
            video_key,
            total = report.total,
            uploaded = report.uploaded,
            skipped = report.skipped,
            failed = report.failed,
            "Cut job finished"
        );
        Ok(report)
    }

    async fn persist_clip(
        &self,
        video_key: &str,
        index: usize,
        total: usize,
        path: PathBuf,
    ) -> ClipOutcome {
        let clip = VideoClip::new(video_key, index, total, &self.config.clip_ext);

        match self.registry.clip_exists(video_key, &clip.clip_key).await {
            Ok(true) => {
                tracing::info!(video_key, clip_key = %clip.clip_key, "Clip already registered");
                metrics::counter!("clips_skipped_total").increment(1);
                return ClipOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(video_key, clip_key = %clip.clip_key, error = %e, "Failed to check clip registry");
                metrics::counter!("clips_failed_total").increment(1);
                return ClipOutcome::Failed;
            }
        }

        // Unregistered until the blob is in place, so a retry re-uploads it.
        if let Err(e) = self.store.upload(&clip.clip_key, &path).await {
            tracing::error!(
                video_key,
                clip_key = %clip.clip_key,
                path = %path.display(),
                error = %e,
                "Failed to upload clip"
            );
            metrics::counter!("clips_failed_total").increment(1);
            return ClipOutcome::Failed;
        }

        match self.registry.insert_clip(&clip).await {
            Ok(true) => {
                metrics::counter!("clips_uploaded_total").increment(1);
                ClipOutcome::Uploaded
            }
            Ok(false) => {
                tracing::info!(video_key, clip_key = %clip.clip_key, "Clip registered concurrently");
                metrics::counter!("clips_skipped_total").increment(1);
                ClipOutcome::Skipped
            }
            Err(e) => {
                tracing::error!(video_key, clip_key = %clip.clip_key, error = %e, "Failed to register clip");
                metrics::counter!("clips_failed_total").increment(1);
                ClipOutcome::Failed
            }
        }
    }
}

/// Local name of the downloaded source, keeping the key's extension so the
/// segmenter can detect the container.
fn source_file_name(video_key: &str) -> String {
    match Path::new(video_key).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("source.{}", ext),
        None => "source".to_string(),
    }
}

/// Wait until `path` exists, backing off exponentially, for at most `deadline`.
pub async fn wait_for_file(path: &Path, deadline: Duration) -> Result<(), CutError> {
    let started = Instant::now();
    let mut delay = FILE_WAIT_INITIAL_DELAY;

    loop {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(());
        }

        let elapsed = started.elapsed();
        if elapsed >= deadline {
            return Err(CutError::Timeout {
                stage: "source file",
                after: deadline,
            });
        }

        tracing::debug!(path = %path.display(), "Waiting for downloaded file");
        sleep(delay.min(deadline - elapsed)).await;
        delay = (delay * 2).min(FILE_WAIT_MAX_DELAY);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CutError {
    #[error("Failed to prepare scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("Failed to download source {key}: {source}")]
    Download {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("Segmentation failed: {0}")]
    Segment(#[from] SegmentError),

    #[error("{failed} of {total} clips failed to upload or register")]
    Incomplete { failed: usize, total: usize },
}
