use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{
    progress::{PresignPolicy, ProgressAggregator},
    queue::JobQueue,
    storage::R2Client,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<JobQueue>,
    pub progress: Arc<ProgressAggregator>,
}

impl AppState {
    pub fn new(db: PgPool, storage: R2Client, queue: JobQueue, presign: PresignPolicy) -> Self {
        let progress = ProgressAggregator::new(
            Arc::new(storage),
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            presign,
        );

        Self {
            db,
            queue: Arc::new(queue),
            progress: Arc::new(progress),
        }
    }
}
