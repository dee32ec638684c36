//! The job record consumed from / written to the job queue and job store.

use serde::{Deserialize, Serialize};

/// Status of an analysis job, as tracked by the external uploader/queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Uploaded,
    Analyzing,
    Analyzed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "UPLOADED",
            JobStatus::Analyzing => "ANALYZING",
            JobStatus::Analyzed => "ANALYZED",
            JobStatus::Error => "ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Analyzed | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job record read from the job queue: `_id` doubles as the `video_id` and the
/// blob-store key for the uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeVideoJob {
    #[serde(rename = "_id")]
    pub video_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl AnalyzeVideoJob {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            status: JobStatus::Uploaded,
            error_message: None,
        }
    }
}
