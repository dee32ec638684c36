//! Job queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed stream entry: {0}")]
    MalformedEntry(String),
}

impl QueueError {
    /// Transport-level failures are worth retrying; a malformed entry is a
    /// data problem that won't fix itself on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueueError::Redis(_))
    }
}
