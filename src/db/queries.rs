use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::task::VideoTask;

fn task_from_row(row: &PgRow) -> Result<VideoTask, sqlx::Error> {
    Ok(VideoTask {
        key: row.try_get("key")?,
        script: row.try_get("script")?,
        encode_param: row.try_get("encode_param")?,
        encode_key: row.try_get("encode_key")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a new video task, or return the existing one for the same key.
pub async fn create_task(
    pool: &PgPool,
    video_key: &str,
    script: &str,
) -> Result<VideoTask, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO video_tasks (key, script)
        VALUES ($1, $2)
        ON CONFLICT (key) DO NOTHING
        "#,
    )
    .bind(video_key)
    .bind(script)
    .execute(pool)
    .await?;

    get_task(pool, video_key)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Get a task by its video key
pub async fn get_task(pool: &PgPool, video_key: &str) -> Result<Option<VideoTask>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT key, script, encode_param, encode_key, created_at, updated_at
        FROM video_tasks
        WHERE key = $1
        "#,
    )
    .bind(video_key)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(task_from_row).transpose()
}

/// Record finalized encode parameters
pub async fn set_encode_param(
    pool: &PgPool,
    video_key: &str,
    encode_param: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE video_tasks
        SET encode_param = $1,
            updated_at = NOW()
        WHERE key = $2
        "#,
    )
    .bind(encode_param)
    .bind(video_key)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record the merged output of a finished encode
pub async fn set_encode_key(
    pool: &PgPool,
    video_key: &str,
    encode_key: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE video_tasks
        SET encode_key = $1,
            updated_at = NOW()
        WHERE key = $2
        "#,
    )
    .bind(encode_key)
    .bind(video_key)
    .execute(pool)
    .await?;

    Ok(())
}
