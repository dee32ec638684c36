//! Blob store error types.

use thiserror::Error;

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("failed to configure blob store client: {0}")]
    Config(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    /// Transport-level failures are worth retrying; a missing/misconfigured
    /// bucket is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BlobError::DownloadFailed(_) | BlobError::Io(_))
    }
}
