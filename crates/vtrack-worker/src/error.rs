//! The job-level error taxonomy (§7): exactly the seven variants the design
//! names, wrapping sub-crate errors with `#[from]` where the mapping is
//! mechanical. `is_retryable`/`is_fatal` drive the Job Runner's retry loop.

use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to open video: {0}")]
    VideoOpenError(String),

    #[error("failed to fetch blob: {0}")]
    BlobFetchError(#[from] vtrack_blobstore::BlobError),

    #[error("detector call failed: {0}")]
    DetectorError(String),

    #[error("store write failed: {0}")]
    StoreWriteError(String),

    #[error("degenerate assignment: {0}")]
    AssignmentDegenerate(String),

    #[error("degenerate interpolation: {0}")]
    InterpolationDegenerate(String),

    #[error("job cancelled: {0}")]
    Cancelled(String),
}

impl From<vtrack_engine::EngineError> for TrackerError {
    fn from(e: vtrack_engine::EngineError) -> Self {
        use vtrack_engine::EngineError::*;
        match e {
            VideoOpen(msg) | Decode(msg) => TrackerError::VideoOpenError(msg),
            Detector(msg) => TrackerError::DetectorError(msg),
            Store(msg) => TrackerError::StoreWriteError(msg),
            AssignmentDegenerate(msg) => TrackerError::AssignmentDegenerate(msg),
            InterpolationDegenerate(msg) => TrackerError::InterpolationDegenerate(msg),
        }
    }
}

impl TrackerError {
    pub fn store_write(msg: impl Into<String>) -> Self {
        Self::StoreWriteError(msg.into())
    }

    pub fn detector(msg: impl Into<String>) -> Self {
        Self::DetectorError(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Worth retrying with backoff before being treated as fatal (§7:
    /// `BlobFetchError` up to 3 with exponential backoff, `StoreWriteError`
    /// up to 3).
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::BlobFetchError(_) | TrackerError::StoreWriteError(_))
    }

    /// Aborts the frame loop and transitions the job to `ERROR` (§7). The
    /// two "degenerate" variants are handled inline by the engine and
    /// should never reach the Job Runner as a fatal error, but are
    /// classified here for completeness of the taxonomy.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TrackerError::AssignmentDegenerate(_) | TrackerError::InterpolationDegenerate(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_fetch_and_store_write_are_retryable() {
        assert!(TrackerError::store_write("x").is_retryable());
        assert!(!TrackerError::detector("x").is_retryable());
    }

    #[test]
    fn degenerate_variants_are_not_fatal() {
        assert!(!TrackerError::AssignmentDegenerate("x".into()).is_fatal());
        assert!(!TrackerError::InterpolationDegenerate("x".into()).is_fatal());
        assert!(TrackerError::VideoOpenError("x".into()).is_fatal());
        assert!(TrackerError::cancelled("x").is_fatal());
    }
}
