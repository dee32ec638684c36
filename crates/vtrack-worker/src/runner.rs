//! The Job Runner (§4.8): claims one job at a time from the queue, drives the
//! pipeline, and is the only place job-status transitions happen (§9). Never
//! claims a second job while one is in flight (§5).

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use vtrack_queue::ClaimedJob;

use crate::error::TrackerError;
use crate::pipeline;
use crate::services::Services;

const BLOB_FETCH_RETRIES: u32 = 3;
const BLOB_FETCH_BASE_BACKOFF: Duration = Duration::from_millis(500);

pub struct JobRunner {
    services: Services,
    consumer_name: String,
}

impl JobRunner {
    pub fn new(services: Services) -> Self {
        let consumer_name = format!("vtrack-worker-{}", Uuid::new_v4());
        Self { services, consumer_name }
    }

    /// Block on the queue between jobs, processing one at a time, until
    /// `shutdown` is signalled (§5 cancellation).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!(consumer = %self.consumer_name, "job runner starting");
        let mut reclaim_tick = tokio::time::interval(self.services.config.reclaim_interval);
        reclaim_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("shutdown signal received, stopping job runner");
                        break;
                    }
                }
                _ = reclaim_tick.tick() => {
                    match self.services.queue.claim_orphaned(&self.consumer_name).await {
                        Ok(Some(claimed)) => self.process_claimed(claimed, &mut shutdown).await,
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "orphan reclaim sweep failed"),
                    }
                }
                claimed = self.services.queue.claim_next(&self.consumer_name) => {
                    match claimed {
                        Ok(Some(claimed)) => self.process_claimed(claimed, &mut shutdown).await,
                        Ok(None) => {}
                        Err(e) => {
                            error!(error = %e, "failed to claim job, backing off");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn process_claimed(&self, claimed: ClaimedJob, shutdown: &mut watch::Receiver<bool>) {
        let video_id = claimed.video_id.clone();
        info!(video_id, "claimed job");

        if let Err(e) = self.services.job_store.mark_analyzing(&video_id).await {
            error!(video_id, error = %e, "failed to mark job analyzing, leaving unacked for redelivery");
            return;
        }

        let result = tokio::select! {
            _ = shutdown.changed() => Err(TrackerError::cancelled("worker shutdown requested")),
            outcome = tokio::time::timeout(self.services.config.job_timeout, self.run_one(&video_id)) => {
                outcome.unwrap_or_else(|_| Err(TrackerError::cancelled("job exceeded wall-clock timeout")))
            }
        };

        match result {
            Ok(()) => {
                if let Err(e) = self.services.job_store.mark_analyzed(&video_id).await {
                    error!(video_id, error = %e, "failed to mark job analyzed, leaving unacked for redelivery");
                    return;
                }
                info!(video_id, "job analyzed");
            }
            Err(e) => {
                warn!(video_id, error = %e, "job failed");
                if let Err(mark_err) = self.services.job_store.mark_error(&video_id, e.to_string()).await {
                    error!(video_id, error = %mark_err, "failed to mark job error, leaving unacked for redelivery");
                    return;
                }
            }
        }

        // Terminal status is durably written; safe to acknowledge now (§4.8).
        if let Err(e) = self.services.queue.ack(&claimed.message_id).await {
            error!(video_id, error = %e, "failed to ack job after terminal status write");
        }
    }

    async fn run_one(&self, video_id: &str) -> Result<(), TrackerError> {
        tokio::fs::create_dir_all(&self.services.config.workdir)
            .await
            .map_err(|e| TrackerError::store_write(format!("cannot create workdir: {e}")))?;
        let video_path = self.services.config.workdir.join(format!("{video_id}.bin"));

        fetch_blob_with_retry(&self.services, video_id, &video_path).await?;

        let result = pipeline::run_job(&self.services, video_id, &video_path).await;
        let _ = tokio::fs::remove_file(&video_path).await;
        result
    }
}

/// Retry up to `BLOB_FETCH_RETRIES` times with exponential backoff before
/// surfacing as fatal (§7 `BlobFetchError`).
async fn fetch_blob_with_retry(
    services: &Services,
    video_id: &str,
    dest: &std::path::Path,
) -> Result<(), TrackerError> {
    let mut attempt = 0;
    loop {
        match services.blob_store.download_to_path(video_id, dest).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < BLOB_FETCH_RETRIES && e.is_retryable() => {
                attempt += 1;
                let backoff = BLOB_FETCH_BASE_BACKOFF * 2u32.pow(attempt - 1);
                warn!(video_id, attempt, error = %e, "blob fetch failed, retrying after backoff");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(TrackerError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        let backoffs: Vec<Duration> = (0..BLOB_FETCH_RETRIES)
            .map(|a| BLOB_FETCH_BASE_BACKOFF * 2u32.pow(a))
            .collect();
        assert_eq!(backoffs[0], Duration::from_millis(500));
        assert_eq!(backoffs[1], Duration::from_millis(1000));
        assert_eq!(backoffs[2], Duration::from_millis(2000));
    }
}
