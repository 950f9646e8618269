use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod health;
pub mod metrics;
pub mod progress;
pub mod tasks;

/// Build the API router with its middleware stack.
pub fn router(state: AppState, metrics_state: metrics::MetricsState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/progress", get(progress::get_progress))
        .route("/tasks", post(tasks::submit_task))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(metrics_state),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
}
