use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use garde::Validate;
use std::time::Instant;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::progress::{ProgressQuery, ProgressResponse};

/// GET /progress?video_key=... — aggregate status of a video task and its clips.
pub async fn get_progress(
    State(state): State<AppState>,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    query
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    metrics::counter!("progress_requests_total").increment(1);
    let start = Instant::now();

    let result = state.progress.progress(&query.video_key).await;

    metrics::histogram!("progress_request_seconds").record(start.elapsed().as_secs_f64());
    match result {
        Ok(response) => {
            tracing::debug!(
                video_key = %query.video_key,
                clips = response.progress.len(),
                status = %response.status,
                "Progress served"
            );
            Ok(Json(response))
        }
        Err(e) => {
            metrics::counter!("progress_requests_failed").increment(1);
            Err(e.into())
        }
    }
}
