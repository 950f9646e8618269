use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::db::queries;
use crate::error::ApiError;
use crate::models::job::CutJob;
use crate::models::task::{SubmitTaskRequest, SubmitTaskResponse};

/// POST /tasks — register an uploaded source video and schedule its cut job.
///
/// Resubmitting an existing key keeps the stored task and schedules another
/// cut; already registered clips are skipped by the worker.
pub async fn submit_task(
    State(state): State<AppState>,
    body: Result<Json<SubmitTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitTaskResponse>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    req.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let task = queries::create_task(&state.db, &req.video_key, &req.script).await?;

    let job = CutJob::new(&task.key);
    state.queue.enqueue(&job).await?;

    tracing::info!(video_key = %task.key, job_id = %job.job_id, "Cut job enqueued");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitTaskResponse {
            status: task.status(),
            key: task.key,
            job_id: job.job_id,
        }),
    ))
}
