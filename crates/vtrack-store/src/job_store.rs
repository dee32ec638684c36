//! Persistence for the job record (§6 "Job record"): the document store also
//! holds the job's `status`/`error_message`, alongside the track documents,
//! so downstream consumers can check `status == ANALYZED` without talking to
//! the job queue directly.

use std::collections::HashMap;

use tracing::debug;

use vtrack_models::{AnalyzeVideoJob, JobStatus};

use crate::client::DocStoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{Document, FromValue, ToValue, Value};

const JOBS_COLLECTION: &str = "jobs";

/// Document-store-backed job record reader/writer. The Job Runner (§4.8) is
/// the only caller that mutates `status`; the tracking core never touches it.
pub struct JobStore {
    client: DocStoreClient,
}

impl JobStore {
    pub fn new(client: DocStoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, video_id: &str) -> StoreResult<Option<AnalyzeVideoJob>> {
        match self.client.get_document(JOBS_COLLECTION, video_id).await? {
            Some(doc) => Ok(Some(document_to_job(&doc)?)),
            None => Ok(None),
        }
    }

    /// Set `status = ANALYZING`. Idempotent: repeated calls with the same
    /// video simply rewrite the same status.
    pub async fn mark_analyzing(&self, video_id: &str) -> StoreResult<()> {
        self.set_status(video_id, JobStatus::Analyzing, None).await
    }

    /// Set `status = ANALYZED`. Idempotent (§4.8): setting it twice is a
    /// no-op from the consumer's point of view.
    pub async fn mark_analyzed(&self, video_id: &str) -> StoreResult<()> {
        self.set_status(video_id, JobStatus::Analyzed, None).await
    }

    /// Set `status = ERROR` with a message (§7).
    pub async fn mark_error(&self, video_id: &str, message: impl Into<String>) -> StoreResult<()> {
        self.set_status(video_id, JobStatus::Error, Some(message.into())).await
    }

    async fn set_status(
        &self,
        video_id: &str,
        status: JobStatus,
        error_message: Option<String>,
    ) -> StoreResult<()> {
        let existing = self.client.get_document(JOBS_COLLECTION, video_id).await?;
        let job = AnalyzeVideoJob {
            video_id: video_id.to_string(),
            status,
            error_message,
        };
        let fields = job_to_fields(&job);

        match existing {
            None => {
                self.client.create_document(JOBS_COLLECTION, video_id, fields).await?;
            }
            Some(doc) => {
                let update_time = doc.update_time.clone().unwrap_or_default();
                self.client
                    .update_document_with_precondition(JOBS_COLLECTION, video_id, fields, &update_time)
                    .await?;
            }
        }
        debug!(video_id, status = %status, "job status updated");
        Ok(())
    }
}

fn job_to_fields(job: &AnalyzeVideoJob) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("_id".to_string(), job.video_id.to_value());
    fields.insert("status".to_string(), job.status.as_str().to_value());
    fields.insert("error_message".to_string(), job.error_message.to_value());
    fields
}

fn document_to_job(doc: &Document) -> StoreResult<AnalyzeVideoJob> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| StoreError::invalid_document("document has no fields"))?;
    let video_id = fields
        .get("_id")
        .and_then(String::from_value)
        .ok_or_else(|| StoreError::invalid_document("missing _id"))?;
    let status_str = fields
        .get("status")
        .and_then(String::from_value)
        .ok_or_else(|| StoreError::invalid_document("missing status"))?;
    let status = parse_status(&status_str)
        .ok_or_else(|| StoreError::invalid_document(format!("unknown status: {status_str}")))?;
    let error_message = fields.get("error_message").and_then(String::from_value);

    Ok(AnalyzeVideoJob { video_id, status, error_message })
}

fn parse_status(s: &str) -> Option<JobStatus> {
    Some(match s {
        "UPLOADED" => JobStatus::Uploaded,
        "ANALYZING" => JobStatus::Analyzing,
        "ANALYZED" => JobStatus::Analyzed,
        "ERROR" => JobStatus::Error,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_job_fields() {
        let job = AnalyzeVideoJob {
            video_id: "v1".to_string(),
            status: JobStatus::Error,
            error_message: Some("boom".to_string()),
        };
        let fields = job_to_fields(&job);
        let doc = Document::new(fields);
        let back = document_to_job(&doc).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [JobStatus::Uploaded, JobStatus::Analyzing, JobStatus::Analyzed, JobStatus::Error] {
            assert_eq!(parse_status(status.as_str()), Some(status));
        }
    }
}
