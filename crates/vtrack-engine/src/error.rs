//! Error types internal to the tracking core (C1-C6).
//!
//! `vtrack-worker`'s `TrackerError` (§7) is the job-level taxonomy; it wraps
//! these where the mapping is mechanical.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to open video: {0}")]
    VideoOpen(String),

    #[error("frame decode failed: {0}")]
    Decode(String),

    #[error("detector call failed: {0}")]
    Detector(String),

    #[error("store operation failed: {0}")]
    Store(String),

    #[error("degenerate assignment: {0}")]
    AssignmentDegenerate(String),

    #[error("degenerate interpolation: {0}")]
    InterpolationDegenerate(String),
}

impl EngineError {
    pub fn video_open(msg: impl Into<String>) -> Self {
        Self::VideoOpen(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn detector(msg: impl Into<String>) -> Self {
        Self::Detector(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
