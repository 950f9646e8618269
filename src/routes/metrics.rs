use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::services::queue::JobQueue;

/// State of the scrape endpoint, separate from the API state.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: Arc<PrometheusHandle>,
    pub queue: Arc<JobQueue>,
}

/// GET /metrics — Prometheus text exposition.
///
/// The cut queue depth is sampled on every scrape.
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    match state.queue.queue_depth().await {
        Ok(depth) => metrics::gauge!("cut_queue_depth").set(depth as f64),
        Err(e) => tracing::warn!(error = %e, "Failed to sample cut queue depth"),
    }
    state.handle.render()
}
