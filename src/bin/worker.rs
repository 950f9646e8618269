use clipline::{
    config::AppConfig,
    db,
    services::{
        cutter::{self, ClipCutter},
        queue::{Delivery, JobQueue},
        segment::FfmpegSegmenter,
        storage::R2Client,
    },
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting clip cut worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!(addr = %config.worker_metrics_addr, "Starting Prometheus metrics listener");
    PrometheusBuilder::new()
        .with_http_listener(config.worker_metrics_addr)
        .install()
        .expect("Failed to install Prometheus metrics exporter");
    cutter::describe_metrics();

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Initializing services");
    let r2_client = R2Client::new(
        &config.r2_bucket,
        &config.r2_endpoint,
        &config.r2_access_key,
        &config.r2_secret_key,
    )
    .expect("Failed to initialize R2 client");

    let queue = JobQueue::new(&config.redis_url).expect("Failed to initialize job queue");

    let cutter_config = config.cutter_config();
    let segmenter = FfmpegSegmenter::new(config.segment_seconds, cutter_config.clip_ext.clone());
    let cutter = ClipCutter::new(
        Arc::new(r2_client),
        Arc::new(db_pool),
        Arc::new(segmenter),
        cutter_config,
    );

    tracing::info!("Worker ready, starting job processing loop");

    loop {
        match process_next_job(&queue, &cutter, config.max_retries).await {
            Ok(true) => {
                tracing::debug!("Job processed, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Queue error, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Process the next job from the queue.
/// Returns Ok(true) if a job was handled, Ok(false) if none was available.
async fn process_next_job(
    queue: &JobQueue,
    cutter: &ClipCutter,
    max_retries: u32,
) -> Result<bool, Box<dyn std::error::Error>> {
    let delivery = match queue.dequeue().await? {
        Some(d) => d,
        None => return Ok(false),
    };
    let job = &delivery.job;

    tracing::info!(
        job_id = %job.job_id,
        video_key = %job.video_key,
        attempt = job.attempt,
        "Processing cut job"
    );

    match cutter.handle(job).await {
        Ok(report) => {
            queue.complete(&delivery).await?;
            tracing::info!(
                job_id = %job.job_id,
                video_key = %job.video_key,
                clips = report.total,
                uploaded = report.uploaded,
                skipped = report.skipped,
                "Cut job completed"
            );
        }
        Err(e) => {
            tracing::error!(job_id = %job.job_id, video_key = %job.video_key, error = %e, "Cut job failed");
            retry_or_drop(queue, &delivery, max_retries).await?;
        }
    }

    Ok(true)
}

async fn retry_or_drop(
    queue: &JobQueue,
    delivery: &Delivery,
    max_retries: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let job = &delivery.job;
    if job.attempt + 1 >= max_retries {
        queue.complete(delivery).await?;
        tracing::warn!(
            job_id = %job.job_id,
            video_key = %job.video_key,
            attempts = job.attempt + 1,
            "Cut job dropped after max retries"
        );
    } else {
        let next = queue.requeue(delivery).await?;
        tracing::info!(
            job_id = %job.job_id,
            video_key = %job.video_key,
            attempt = next.attempt,
            "Cut job re-queued for retry"
        );
    }
    Ok(())
}
