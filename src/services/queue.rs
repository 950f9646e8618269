use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::models::job::CutJob;

const QUEUE_KEY: &str = "clipline:cut_jobs";
const PROCESSING_KEY: &str = "clipline:cut_processing";

/// A dequeued job together with its payload exactly as held in the in-flight list.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub job: CutJob,
    payload: String,
}

impl Delivery {
    pub fn from_payload(payload: String) -> Result<Self, QueueError> {
        let job = serde_json::from_str(&payload).map_err(QueueError::Serialize)?;
        Ok(Self { job, payload })
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Redis-backed queue of cut jobs with an in-flight list.
pub struct JobQueue {
    client: redis::Client,
}

impl JobQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)
    }

    /// Enqueue a cut job.
    pub async fn enqueue(&self, job: &CutJob) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Take the oldest job, moving it to the in-flight list until completed.
    pub async fn dequeue(&self) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.connection().await?;
        let result: Option<String> = conn
            .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
            .await
            .map_err(QueueError::Redis)?;

        result.map(Delivery::from_payload).transpose()
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Number of jobs waiting for a worker.
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await.map_err(QueueError::Redis)?;
        Ok(depth)
    }

    /// Acknowledge a delivered job (remove it from the in-flight list).
    pub async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, delivery.payload())
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Schedule another delivery of an in-flight job and drop the current one
    /// from the in-flight list in a single transaction.
    pub async fn requeue(&self, delivery: &Delivery) -> Result<CutJob, QueueError> {
        let next = delivery.job.retry();
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(&next).map_err(QueueError::Serialize)?;
        redis::pipe()
            .atomic()
            .lpush(QUEUE_KEY, &payload)
            .ignore()
            .lrem(PROCESSING_KEY, 1, delivery.payload())
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(next)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
