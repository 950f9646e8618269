//! Builds the progress view of a video task from its clip rows, its task row
//! and a batch of freshly issued download links.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::db::{ClipRegistry, TaskRecords};
use crate::models::progress::{ProgressItem, ProgressResponse};
use crate::services::storage::{ObjectStore, StorageError};

/// How download links are issued for one progress query.
#[derive(Debug, Clone, Copy)]
pub struct PresignPolicy {
    /// Validity window of each link.
    pub ttl: Duration,
    /// Deadline for a single link request.
    pub timeout: Duration,
    /// Link requests in flight at once.
    pub concurrency: usize,
}

pub struct ProgressAggregator {
    store: Arc<dyn ObjectStore>,
    clips: Arc<dyn ClipRegistry>,
    tasks: Arc<dyn TaskRecords>,
    policy: PresignPolicy,
}

impl ProgressAggregator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        clips: Arc<dyn ClipRegistry>,
        tasks: Arc<dyn TaskRecords>,
        policy: PresignPolicy,
    ) -> Self {
        Self {
            store,
            clips,
            tasks,
            policy,
        }
    }

    /// Snapshot of `video_key` with a link for every stored artifact.
    ///
    /// Either every link is issued or the whole query fails; a partially
    /// linked response is never returned.
    pub async fn progress(&self, video_key: &str) -> Result<ProgressResponse, ProgressError> {
        let task = self
            .tasks
            .get_task(video_key)
            .await?
            .ok_or_else(|| ProgressError::NotFound(video_key.to_string()))?;

        let mut clips = self.clips.list_clips(video_key).await?;
        clips.sort_by_key(|clip| clip.index);

        // Two slots per clip (clip, encoded clip), then two for the task
        // (source, encoded output). Empty keys sign to an empty link.
        let mut keys = Vec::with_capacity(clips.len() * 2 + 2);
        for clip in &clips {
            keys.push(Some(clip.clip_key.clone()));
            keys.push(non_empty(&clip.encode_key));
        }
        keys.push(Some(task.key.clone()));
        keys.push(non_empty(&task.encode_key));

        let urls = self.sign_all(keys).await.inspect_err(|e| {
            tracing::error!(video_key, error = %e, "Failed to issue download links");
        })?;

        let (clip_urls, task_urls) = urls.split_at(clips.len() * 2);
        let progress = clips
            .into_iter()
            .zip(clip_urls.chunks_exact(2))
            .map(|(clip, pair)| ProgressItem {
                completed: clip.completed,
                key: clip.clip_key,
                url: pair[0].clone(),
                encode_key: clip.encode_key,
                encode_url: pair[1].clone(),
            })
            .collect();

        let status = task.status();
        if task.encode_key.is_empty() {
            tracing::debug!(video_key, %status, "Encoded output not available yet");
        }

        Ok(ProgressResponse {
            key: task.key,
            url: task_urls[0].clone(),
            encode_key: task.encode_key,
            encode_param: task.encode_param,
            encode_url: task_urls[1].clone(),
            script: task.script,
            status,
            progress,
        })
    }

    /// Issue a link for every slot. Each request settles into its own slot;
    /// the slots are only inspected once all of them have settled, and the
    /// lowest failing slot decides the error.
    async fn sign_all(&self, keys: Vec<Option<String>>) -> Result<Vec<String>, ProgressError> {
        let slots: Vec<Result<String, ProgressError>> = stream::iter(keys)
            .map(|key| self.sign(key))
            .buffered(self.policy.concurrency.max(1))
            .collect()
            .await;

        slots.into_iter().collect()
    }

    async fn sign(&self, key: Option<String>) -> Result<String, ProgressError> {
        let Some(key) = key else {
            return Ok(String::new());
        };

        let signed = timeout(self.policy.timeout, self.store.presign_get(&key, self.policy.ttl)).await;
        match signed {
            Ok(Ok(url)) => Ok(url),
            Ok(Err(e)) => Err(ProgressError::Sign { key, source: e }),
            Err(_) => Err(ProgressError::SignTimeout {
                key,
                after: self.policy.timeout,
            }),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    (!key.is_empty()).then(|| key.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("Video task not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to sign download link for {key}: {source}")]
    Sign {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Signing download link for {key} timed out after {after:?}")]
    SignTimeout { key: String, after: Duration },
}
