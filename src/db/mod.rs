use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::models::clip::VideoClip;
use crate::models::task::VideoTask;

pub mod clip_queries;
pub mod queries;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Durable per-clip records keyed by (video key, clip key).
#[async_trait]
pub trait ClipRegistry: Send + Sync {
    async fn clip_exists(&self, video_key: &str, clip_key: &str) -> Result<bool, sqlx::Error>;

    /// Returns `false` when the row already existed; a duplicate is not an error.
    async fn insert_clip(&self, clip: &VideoClip) -> Result<bool, sqlx::Error>;

    /// All clips of a video, ordered by index.
    async fn list_clips(&self, video_key: &str) -> Result<Vec<VideoClip>, sqlx::Error>;
}

/// Per-video job records.
#[async_trait]
pub trait TaskRecords: Send + Sync {
    async fn get_task(&self, video_key: &str) -> Result<Option<VideoTask>, sqlx::Error>;
}

#[async_trait]
impl ClipRegistry for PgPool {
    async fn clip_exists(&self, video_key: &str, clip_key: &str) -> Result<bool, sqlx::Error> {
        clip_queries::clip_exists(self, video_key, clip_key).await
    }

    async fn insert_clip(&self, clip: &VideoClip) -> Result<bool, sqlx::Error> {
        clip_queries::insert_clip(self, clip).await
    }

    async fn list_clips(&self, video_key: &str) -> Result<Vec<VideoClip>, sqlx::Error> {
        clip_queries::list_clips(self, video_key).await
    }
}

#[async_trait]
impl TaskRecords for PgPool {
    async fn get_task(&self, video_key: &str) -> Result<Option<VideoTask>, sqlx::Error> {
        queries::get_task(self, video_key).await
    }
}
