//! Minimal interfaces to the external collaborators named in §6: the object
//! detector and the document store. The tracking core depends only on these
//! traits; `vtrack-store` and the HTTP detector client in this crate provide
//! the concrete implementations, and tests use hand-written fakes (§10.4).

use async_trait::async_trait;
use opencv::core::Mat;

use vtrack_models::{Detection, PersistentTrack};

/// The external object detector. No state is retained across calls.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Run inference on a single decoded color frame.
    async fn infer(&self, color_frame: &Mat) -> anyhow::Result<Vec<Detection>>;
}

/// The document store's view relevant to the tracking core (§4.7): per-identity
/// upserts, idempotent on `(track_key, frame_index)`, plus the bounded scan
/// used by identity re-acquisition (§4.4).
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Create or append to the persistent track document. Idempotent: a
    /// second call with the same `(video_id, track_id, obs.frame_index)`
    /// must not insert a duplicate observation.
    async fn upsert_observation(
        &self,
        video_id: &str,
        track_id: u32,
        obs: vtrack_models::FrameObservation,
    ) -> anyhow::Result<()>;

    /// Persistent tracks for `video_id` whose last observation falls within
    /// `window_frames` of (and strictly before) `before_frame`.
    async fn scan_recent_dead(
        &self,
        video_id: &str,
        before_frame: u64,
        window_frames: u64,
    ) -> anyhow::Result<Vec<PersistentTrack>>;

    /// Fetch the current document for a track, if any (used by the gap
    /// corrector's post-pass and by tests).
    async fn get_track(&self, video_id: &str, track_id: u32) -> anyhow::Result<Option<PersistentTrack>>;
}
