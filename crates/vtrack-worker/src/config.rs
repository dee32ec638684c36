//! Top-level worker configuration: the tracking core's tunables (§6) plus
//! the ambient knobs for the Job Runner itself (§4.8, §5).

use std::time::Duration;

use vtrack_engine::TrackerConfig;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub tracker: TrackerConfig,
    /// Per-job wall-clock timeout; on expiry the job transitions to `ERROR` (§5).
    pub job_timeout: Duration,
    /// Scratch directory the blob is downloaded into before decoding.
    pub workdir: std::path::PathBuf,
    /// How often the orphan-reclaim sweep runs (§4.8).
    pub reclaim_interval: Duration,
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self {
            tracker: TrackerConfig::from_env(),
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            workdir: std::env::var("WORKER_WORKDIR")
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("vtrack-worker")),
            reclaim_interval: Duration::from_secs(
                std::env::var("WORKER_RECLAIM_INTERVAL_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_reasonable() {
        std::env::remove_var("WORKER_JOB_TIMEOUT_SECONDS");
        std::env::remove_var("WORKER_RECLAIM_INTERVAL_SECONDS");
        let config = WorkerConfig::from_env();
        assert_eq!(config.job_timeout, Duration::from_secs(1800));
        assert_eq!(config.reclaim_interval, Duration::from_secs(60));
    }
}
