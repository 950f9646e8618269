use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request to cut one source video into clips, as carried by the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CutJob {
    pub job_id: Uuid,
    pub video_key: String,
    /// Zero on first delivery, incremented on every re-enqueue.
    #[serde(default)]
    pub attempt: u32,
}

impl CutJob {
    pub fn new(video_key: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            video_key: video_key.into(),
            attempt: 0,
        }
    }

    /// The same job scheduled for another delivery.
    pub fn retry(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}
