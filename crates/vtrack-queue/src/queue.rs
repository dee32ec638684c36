//! Job queue: a Redis Streams consumer group standing in for the
//! "find-one-and-set-status" atomic claim the design calls for (§4.8).
//!
//! The consumer group's pending-entries-list is the claim: `XREADGROUP`
//! claims at most one unclaimed entry, and the entry is only acknowledged
//! (`XACK` + `XDEL`) once the job's terminal status has been durably written
//! to the job store. A crash between claim and ack leaves the entry pending;
//! [`JobQueue::claim_orphaned`] reclaims entries idle longer than a
//! configurable threshold so at-least-once delivery holds across restarts.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};

const FIELD_VIDEO_ID: &str = "video_id";

/// One claimed queue entry: the stream message id (needed to ack) and the
/// `video_id` that doubles as the blob-store key and job document id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedJob {
    pub message_id: String,
    pub video_id: String,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub stream_name: String,
    pub consumer_group: String,
    /// How long `claim_next` blocks waiting for a new entry before returning
    /// `None` (§4.8: "on empty, sleep briefly and retry").
    pub poll_block: Duration,
    /// Minimum idle time before an unacknowledged entry is considered
    /// orphaned by a crashed worker and eligible for reclamation.
    pub claim_min_idle: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vtrack:jobs".to_string(),
            consumer_group: "vtrack:workers".to_string(),
            poll_block: Duration::from_secs(5),
            claim_min_idle: Duration::from_secs(1800),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(d.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(d.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP").unwrap_or(d.consumer_group),
            poll_block: Duration::from_millis(
                std::env::var("QUEUE_POLL_BLOCK_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.poll_block.as_millis() as u64),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("QUEUE_CLAIM_MIN_IDLE_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.claim_min_idle.as_secs()),
            ),
        }
    }
}

pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Create the consumer group if it doesn't already exist.
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!(group = %self.config.consumer_group, "created consumer group"),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(group = %self.config.consumer_group, "consumer group already exists");
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }
        Ok(())
    }

    /// Enqueue an `AnalyzeVideoJob` for `video_id` (the uploader's side of
    /// the handshake; provided here so the repo is runnable end-to-end and
    /// for test fixtures).
    pub async fn enqueue(&self, video_id: &str) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg(FIELD_VIDEO_ID)
            .arg(video_id)
            .query_async(&mut conn)
            .await?;
        debug!(video_id, message_id, "enqueued analyze-video job");
        Ok(message_id)
    }

    /// Block for up to `poll_block` waiting for a new, unclaimed entry. This
    /// is the "find-one-and-set-status" primitive (§4.8): the Runner blocks
    /// here between jobs rather than polling a pool.
    pub async fn claim_next(&self, consumer_name: &str) -> QueueResult<Option<ClaimedJob>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(self.config.poll_block.as_millis() as u64)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        for stream_key in result.keys {
            for entry in stream_key.ids {
                return Ok(Some(self.parse_entry(entry)?));
            }
        }
        Ok(None)
    }

    /// Reclaim at most one entry that's been pending (claimed but not acked)
    /// for longer than `claim_min_idle` — recovery for a worker that crashed
    /// mid-job (§4.8, §5 cancellation/timeout semantics).
    pub async fn claim_orphaned(&self, consumer_name: &str) -> QueueResult<Option<ClaimedJob>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let min_idle_ms = self.config.claim_min_idle.as_millis() as u64;

        let claimed: redis::streams::StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms)
            .arg("0-0")
            .arg("COUNT")
            .arg(1)
            .query_async(&mut conn)
            .await?;

        for entry in claimed.claimed {
            info!(message_id = %entry.id, "reclaimed orphaned job from crashed worker");
            return Ok(Some(self.parse_entry(entry)?));
        }
        Ok(None)
    }

    /// Acknowledge and remove a job entry. Only called after the job's
    /// terminal status (`ANALYZED`/`ERROR`) has been durably written, and is
    /// itself idempotent — acking twice is a no-op.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;
        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;
        debug!(message_id, "acked job");
        Ok(())
    }

    /// Reset the idle timer on an in-flight job without transferring the
    /// payload, so a long-running video doesn't get reclaimed as orphaned
    /// while still being processed.
    pub async fn heartbeat(&self, consumer_name: &str, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: redis::Value = redis::cmd("XCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    fn parse_entry(&self, entry: redis::streams::StreamId) -> QueueResult<ClaimedJob> {
        match entry.map.get(FIELD_VIDEO_ID) {
            Some(redis::Value::BulkString(bytes)) => Ok(ClaimedJob {
                message_id: entry.id.clone(),
                video_id: String::from_utf8_lossy(bytes).to_string(),
            }),
            _ => {
                warn!(message_id = %entry.id, "entry missing video_id field, dropping");
                Err(QueueError::MalformedEntry(entry.id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let c = QueueConfig::default();
        assert_eq!(c.stream_name, "vtrack:jobs");
        assert_eq!(c.consumer_group, "vtrack:workers");
        assert_eq!(c.claim_min_idle, Duration::from_secs(1800));
    }
}
