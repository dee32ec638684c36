//! The explicit `Services` structure threaded into the Job Runner (§9):
//! every external collaborator the core needs, assembled once at startup
//! instead of reached for via module-level globals.

use std::sync::Arc;

use vtrack_blobstore::BlobStoreClient;
use vtrack_engine::collaborators::{Detector, TrackStore};
use vtrack_engine::detector::HttpDetector;
use vtrack_queue::JobQueue;
use vtrack_store::{DocStoreClient, FirestoreTrackStore, JobStore};

use crate::config::WorkerConfig;

pub struct Services {
    pub config: WorkerConfig,
    pub queue: JobQueue,
    pub blob_store: BlobStoreClient,
    pub track_store: Arc<dyn TrackStore>,
    pub job_store: JobStore,
    pub detector: Arc<dyn Detector>,
}

impl Services {
    pub async fn from_env(config: WorkerConfig) -> anyhow::Result<Self> {
        let queue = JobQueue::from_env()?;
        queue.init().await?;

        let blob_store = BlobStoreClient::from_env().await?;

        let doc_store = DocStoreClient::from_env().await?;
        let track_store: Arc<dyn TrackStore> = Arc::new(FirestoreTrackStore::new(doc_store.clone()));
        let job_store = JobStore::new(doc_store);

        let detector: Arc<dyn Detector> = Arc::new(HttpDetector::from_env()?);

        Ok(Self {
            config,
            queue,
            blob_store,
            track_store,
            job_store,
            detector,
        })
    }
}
