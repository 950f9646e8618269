use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// File-name prefix of every clip the segmenter writes.
const CLIP_PREFIX: &str = "clip-";

/// Cuts one local source video into an ordered sequence of clip files.
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Clips are returned in index order, index 0 first.
    async fn cut(&self, source: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, SegmentError>;
}

/// Stream-copy segmentation through the `ffmpeg` segment muxer.
///
/// The child process is killed when the returned future is dropped, so a
/// caller-side deadline also stops ffmpeg.
pub struct FfmpegSegmenter {
    segment_seconds: u32,
    clip_ext: String,
}

impl FfmpegSegmenter {
    pub fn new(segment_seconds: u32, clip_ext: impl Into<String>) -> Self {
        Self {
            segment_seconds: segment_seconds.max(1),
            clip_ext: clip_ext.into(),
        }
    }

    fn build_args(&self, source: &Path, output_dir: &Path) -> Vec<String> {
        let pattern = output_dir.join(format!("{}%05d.{}", CLIP_PREFIX, self.clip_ext));
        vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            source.to_string_lossy().to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-f".to_string(),
            "segment".to_string(),
            "-segment_time".to_string(),
            self.segment_seconds.to_string(),
            "-reset_timestamps".to_string(),
            "1".to_string(),
            pattern.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Segmenter for FfmpegSegmenter {
    async fn cut(&self, source: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, SegmentError> {
        tokio::fs::create_dir_all(output_dir).await?;

        let args = self.build_args(source, output_dir);
        tracing::debug!(args = %args.join(" "), "Running ffmpeg segmenter");

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SegmentError::FfmpegNotFound,
                _ => SegmentError::Io(e),
            })?;

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SegmentError::Failed {
                code: output.status.code(),
                stderr: stderr.lines().last().unwrap_or_default().to_string(),
            });
        }

        let clips = collect_clips(output_dir, &self.clip_ext).await?;
        if clips.is_empty() {
            return Err(SegmentError::NoOutput);
        }
        Ok(clips)
    }
}

/// Clip files written into `dir`, sorted so that the zero-padded sequence
/// number gives index order.
pub async fn collect_clips(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, SegmentError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut clips = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_clip = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(CLIP_PREFIX))
            && path.extension().and_then(|e| e.to_str()) == Some(ext);
        if is_clip {
            clips.push(path);
        }
    }

    clips.sort();
    Ok(clips)
}

#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffmpeg exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("segmentation produced no clips")]
    NoOutput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
