//! In-memory stand-ins for the object store, the clip registry, the task
//! records and the segmenter.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clipline::db::{ClipRegistry, TaskRecords};
use clipline::models::clip::VideoClip;
use clipline::models::task::VideoTask;
use clipline::services::cutter::CutterConfig;
use clipline::services::segment::{SegmentError, Segmenter};
use clipline::services::storage::{ObjectStore, StorageError};

pub const LINK_HOST: &str = "https://r2.test";

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<HashMap<String, usize>>,
    presigned: Mutex<Vec<String>>,
    failing_uploads: Mutex<HashSet<String>>,
    failing_links: Mutex<HashSet<String>>,
    slow_links: Mutex<HashSet<String>>,
    download_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn with_object(self, key: &str, data: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        self
    }

    pub fn fail_upload(&self, key: &str) {
        self.failing_uploads.lock().unwrap().insert(key.to_string());
    }

    pub fn heal_uploads(&self) {
        self.failing_uploads.lock().unwrap().clear();
    }

    pub fn fail_link(&self, key: &str) {
        self.failing_links.lock().unwrap().insert(key.to_string());
    }

    pub fn stall_link(&self, key: &str) {
        self.slow_links.lock().unwrap().insert(key.to_string());
    }

    pub fn delay_downloads(&self, delay: Duration) {
        *self.download_delay.lock().unwrap() = Some(delay);
    }

    pub fn upload_count(&self, key: &str) -> usize {
        self.uploads.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_uploads(&self) -> usize {
        self.uploads.lock().unwrap().values().sum()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn presigned_keys(&self) -> Vec<String> {
        self.presigned.lock().unwrap().clone()
    }
}

pub fn link_for(key: &str) -> String {
    format!("{}/{}?X-Amz-Expires=172800", LINK_HOST, key)
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, key: &str, dest: &Path) -> Result<(), StorageError> {
        let delay = *self.download_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let data = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        tokio::fs::write(dest, data).await?;
        Ok(())
    }

    async fn upload(&self, key: &str, src: &Path) -> Result<(), StorageError> {
        if self.failing_uploads.lock().unwrap().contains(key) {
            return Err(StorageError::Status {
                key: key.to_string(),
                code: 503,
            });
        }

        let data = tokio::fs::read(src).await?;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        *self
            .uploads
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default() += 1;
        Ok(())
    }

    async fn presign_get(&self, key: &str, _ttl: Duration) -> Result<String, StorageError> {
        self.presigned.lock().unwrap().push(key.to_string());

        let stalled = self.slow_links.lock().unwrap().contains(key);
        if stalled {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.failing_links.lock().unwrap().contains(key) {
            return Err(StorageError::Status {
                key: key.to_string(),
                code: 500,
            });
        }
        Ok(link_for(key))
    }
}

/// Clip registry enforcing uniqueness on (video_key, clip_key).
#[derive(Default)]
pub struct MemoryRegistry {
    rows: Mutex<Vec<VideoClip>>,
    reverse_reads: bool,
}

impl MemoryRegistry {
    /// A registry whose reads come back newest first, like an unordered scan.
    pub fn reversed() -> Self {
        Self {
            rows: Mutex::default(),
            reverse_reads: true,
        }
    }

    pub fn rows(&self) -> Vec<VideoClip> {
        self.rows.lock().unwrap().clone()
    }

    pub fn rows_for(&self, video_key: &str) -> Vec<VideoClip> {
        self.rows()
            .into_iter()
            .filter(|c| c.video_key == video_key)
            .collect()
    }

    pub fn seed(&self, clip: VideoClip) {
        self.rows.lock().unwrap().push(clip);
    }
}

#[async_trait]
impl ClipRegistry for MemoryRegistry {
    async fn clip_exists(&self, video_key: &str, clip_key: &str) -> Result<bool, sqlx::Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.video_key == video_key && c.clip_key == clip_key))
    }

    async fn insert_clip(&self, clip: &VideoClip) -> Result<bool, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|c| c.video_key == clip.video_key && c.clip_key == clip.clip_key)
        {
            return Ok(false);
        }
        rows.push(clip.clone());
        Ok(true)
    }

    async fn list_clips(&self, video_key: &str) -> Result<Vec<VideoClip>, sqlx::Error> {
        let mut rows = self.rows_for(video_key);
        if self.reverse_reads {
            rows.reverse();
        }
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryTasks {
    tasks: Mutex<HashMap<String, VideoTask>>,
}

impl MemoryTasks {
    pub fn insert(&self, task: VideoTask) {
        self.tasks.lock().unwrap().insert(task.key.clone(), task);
    }
}

#[async_trait]
impl TaskRecords for MemoryTasks {
    async fn get_task(&self, video_key: &str) -> Result<Option<VideoTask>, sqlx::Error> {
        Ok(self.tasks.lock().unwrap().get(video_key).cloned())
    }
}

pub fn task(key: &str, encode_param: &str, encode_key: &str) -> VideoTask {
    let now = Utc::now();
    VideoTask {
        key: key.to_string(),
        script: "import vapoursynth as vs".to_string(),
        encode_param: encode_param.to_string(),
        encode_key: encode_key.to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// Writes a fixed number of clip files, in the naming the ffmpeg segmenter uses.
pub struct FixedSegmenter {
    pub clips: usize,
}

#[async_trait]
impl Segmenter for FixedSegmenter {
    async fn cut(&self, source: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, SegmentError> {
        let data = tokio::fs::read(source).await?;
        tokio::fs::create_dir_all(output_dir).await?;

        let mut clips = Vec::with_capacity(self.clips);
        for i in 0..self.clips {
            let path = output_dir.join(format!("clip-{:05}.mkv", i));
            let mut chunk = data.clone();
            chunk.extend_from_slice(format!("#{}", i).as_bytes());
            tokio::fs::write(&path, chunk).await?;
            clips.push(path);
        }
        Ok(clips)
    }
}

pub struct BrokenSegmenter;

#[async_trait]
impl Segmenter for BrokenSegmenter {
    async fn cut(&self, _source: &Path, _output_dir: &Path) -> Result<Vec<PathBuf>, SegmentError> {
        Err(SegmentError::Failed {
            code: Some(1),
            stderr: "Invalid data found when processing input".to_string(),
        })
    }
}

/// Never finishes on its own; only a caller deadline ends it.
pub struct StallingSegmenter;

#[async_trait]
impl Segmenter for StallingSegmenter {
    async fn cut(&self, _source: &Path, _output_dir: &Path) -> Result<Vec<PathBuf>, SegmentError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }
}

pub fn cutter_config(scratch_root: &Path) -> CutterConfig {
    CutterConfig {
        clip_ext: "mkv".to_string(),
        scratch_root: scratch_root.to_path_buf(),
        download_timeout: Duration::from_secs(5),
        segment_timeout: Duration::from_secs(5),
        file_wait_timeout: Duration::from_secs(1),
        upload_concurrency: 2,
    }
}

/// Number of entries left under a scratch root.
pub fn scratch_entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}
