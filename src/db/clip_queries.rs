use sqlx::{PgPool, Row};

use crate::models::clip::VideoClip;

/// Check whether a clip of this video is already registered
pub async fn clip_exists(
    pool: &PgPool,
    video_key: &str,
    clip_key: &str,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM video_clips
            WHERE video_key = $1 AND clip_key = $2
        ) AS present
        "#,
    )
    .bind(video_key)
    .bind(clip_key)
    .fetch_one(pool)
    .await?;

    row.try_get("present")
}

/// Register a clip. Redelivered inserts hit the unique constraint and are
/// reported as `false` instead of failing.
pub async fn insert_clip(pool: &PgPool, clip: &VideoClip) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO video_clips (video_key, clip_key, clip_index, total, completed, encode_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&clip.video_key)
    .bind(&clip.clip_key)
    .bind(clip.index)
    .bind(clip.total)
    .bind(clip.completed)
    .bind(&clip.encode_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// List every clip of a video in index order
pub async fn list_clips(pool: &PgPool, video_key: &str) -> Result<Vec<VideoClip>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT video_key, clip_key, clip_index, total, completed, encode_key
        FROM video_clips
        WHERE video_key = $1
        ORDER BY clip_index ASC
        "#,
    )
    .bind(video_key)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(VideoClip {
                video_key: r.try_get("video_key")?,
                clip_key: r.try_get("clip_key")?,
                index: r.try_get("clip_index")?,
                total: r.try_get("total")?,
                completed: r.try_get("completed")?,
                encode_key: r.try_get("encode_key")?,
            })
        })
        .collect()
}

/// Mark a clip as processed downstream, recording its output key
pub async fn complete_clip(
    pool: &PgPool,
    video_key: &str,
    clip_key: &str,
    encode_key: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE video_clips
        SET completed = TRUE,
            encode_key = $1
        WHERE video_key = $2 AND clip_key = $3
        "#,
    )
    .bind(encode_key)
    .bind(video_key)
    .bind(clip_key)
    .execute(pool)
    .await?;

    Ok(())
}
