use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::task::TaskStatus;

/// Query string of `GET /progress`.
#[derive(Debug, Deserialize, Validate)]
pub struct ProgressQuery {
    #[garde(length(min = 1))]
    pub video_key: String,
}

/// Snapshot of a video task and all of its clips.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressResponse {
    pub key: String,
    pub url: String,
    pub encode_key: String,
    pub encode_param: String,
    pub encode_url: String,
    pub script: String,
    pub status: TaskStatus,
    pub progress: Vec<ProgressItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressItem {
    pub completed: bool,
    pub key: String,
    pub url: String,
    pub encode_key: String,
    /// Empty when the clip has no processed output yet.
    pub encode_url: String,
}
