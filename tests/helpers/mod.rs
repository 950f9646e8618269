//! Test helper utilities for E2E testing against a running API and worker

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

/// Response from POST /tasks
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub key: String,
    pub status: String,
    pub job_id: String,
}

/// Response from GET /progress
#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub key: String,
    pub url: String,
    pub encode_key: String,
    pub encode_param: String,
    pub encode_url: String,
    pub script: String,
    pub status: String,
    pub progress: Vec<ProgressItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressItem {
    pub completed: bool,
    pub key: String,
    pub url: String,
    pub encode_key: String,
    pub encode_url: String,
}

/// Submit an already uploaded source video for cutting
pub async fn submit_task(
    client: &reqwest::Client,
    base_url: &str,
    video_key: &str,
) -> Result<SubmitResponse, Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/tasks", base_url))
        .json(&serde_json::json!({ "video_key": video_key, "script": "" }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Submit failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<SubmitResponse>().await?)
}

/// Fetch the progress snapshot of a video
pub async fn get_progress(
    client: &reqwest::Client,
    base_url: &str,
    video_key: &str,
) -> Result<ProgressResponse, Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/progress", base_url))
        .query(&[("video_key", video_key)])
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        return Err(format!("Progress query failed: {}", error_text).into());
    }

    Ok(response.json::<ProgressResponse>().await?)
}

/// Poll progress until the worker has registered at least one clip (with timeout)
pub async fn wait_for_clips(
    client: &reqwest::Client,
    base_url: &str,
    video_key: &str,
    timeout_secs: u64,
) -> Result<ProgressResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms

    for attempt in 0..max_attempts {
        let progress = get_progress(client, base_url, video_key).await?;

        let total = progress.progress.len();
        if total > 0 {
            return Ok(progress);
        }

        if attempt % 10 == 0 && attempt > 0 {
            println!("  ... still waiting (attempt {}/{})", attempt, max_attempts);
        }
        sleep(Duration::from_millis(500)).await;
    }

    Err(format!("No clips registered within {} seconds", timeout_secs).into())
}
