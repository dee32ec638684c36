//! Document store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    /// Transient failures worth retrying with backoff (§4.7, §7 `StoreWriteError`).
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Network(_) | StoreError::RequestFailed(_))
    }

    /// A racing writer won the optimistic-concurrency precondition; caller
    /// should re-read and retry rather than treat this as fatal.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, StoreError::PreconditionFailed(_))
    }
}
