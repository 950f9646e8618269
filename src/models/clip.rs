use serde::{Deserialize, Serialize};

/// Deterministic blob key of the clip at `index` of `video_key`.
pub fn clip_key(video_key: &str, index: usize, ext: &str) -> String {
    format!("{}-clip-{}.{}", video_key, index, ext)
}

/// One segment of a source video as tracked by the clip registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoClip {
    /// Owning video identifier.
    pub video_key: String,
    pub clip_key: String,
    /// Zero-based position within the video's clips.
    pub index: i32,
    /// Clip count of the cut run that produced this row.
    pub total: i32,
    pub completed: bool,
    /// Blob key of the processed clip; empty until available.
    pub encode_key: String,
}

impl VideoClip {
    /// A freshly cut clip, not yet processed downstream.
    pub fn new(video_key: &str, index: usize, total: usize, ext: &str) -> Self {
        Self {
            video_key: video_key.to_string(),
            clip_key: clip_key(video_key, index, ext),
            index: index as i32,
            total: total as i32,
            completed: false,
            encode_key: String::new(),
        }
    }
}
