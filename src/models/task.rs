use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle of a video task as seen by clients.
///
/// Never stored; always derived from the encode fields of [`VideoTask`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
}

impl TaskStatus {
    /// Evaluated in order: no encode parameters means pending, parameters
    /// without an output means running, otherwise completed.
    pub fn derive(encode_param: &str, encode_key: &str) -> Self {
        if encode_param.is_empty() {
            TaskStatus::Pending
        } else if encode_key.is_empty() {
            TaskStatus::Running
        } else {
            TaskStatus::Completed
        }
    }
}

/// One submitted video job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoTask {
    /// Video identifier, also the key of the source blob.
    pub key: String,
    pub script: String,
    pub encode_param: String,
    /// Blob key of the final encoded output; empty until encoding completes.
    pub encode_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoTask {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::derive(&self.encode_param, &self.encode_key)
    }
}

/// Request body for submitting a new video task.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitTaskRequest {
    #[garde(length(min = 1, max = 1024))]
    pub video_key: String,

    #[serde(default)]
    #[garde(skip)]
    pub script: String,
}

/// Response after submitting a video task.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTaskResponse {
    pub key: String,
    pub status: TaskStatus,
    pub job_id: uuid::Uuid,
}
