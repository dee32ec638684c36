//! C4: Identity Re-acquirer. When C3 is about to mint a new `track_id`,
//! checks recently-dead tracks for the same video and reuses their identity
//! if the new detection looks like the same object.

use std::collections::{HashMap, HashSet};

use opencv::core::Mat;

use vtrack_models::{BBox, PersistentTrack};

use crate::collaborators::TrackStore;
use crate::config::TrackerConfig;
use crate::similarity::patch_ssim;

/// Per-job cache of retired tracks' last sub-image, keyed by `track_id`.
/// Patches never touch the persistent store (§9: in-memory state is
/// advisory); once a track ages out of the re-acquisition window its entry
/// is dropped and only the IoU fallback remains available.
#[derive(Default)]
pub struct DeadPatchCache {
    patches: HashMap<u32, (Mat, u64)>,
}

impl DeadPatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, track_id: u32, patch: Mat, last_frame_index: u64) {
        self.patches.insert(track_id, (patch, last_frame_index));
    }

    /// Drop entries whose track fell out of every possible re-acquisition
    /// window (a generous upper bound on `window_frames` across the job).
    pub fn prune(&mut self, current_frame_index: u64, max_window_frames: u64) {
        self.patches
            .retain(|_, (_, last_frame_index)| current_frame_index.saturating_sub(*last_frame_index) <= max_window_frames);
    }

    fn get(&self, track_id: u32) -> Option<&Mat> {
        self.patches.get(&track_id).map(|(m, _)| m)
    }
}

/// Attempt to re-acquire an identity for a newborn detection. Returns the
/// `track_id` to reuse, or `None` if no recent dead track matches closely
/// enough. Never returns a track id in `live_ids` — callers must pass every
/// id that is currently live, including ids already reacquired by an
/// earlier detection in this same frame, so an identity is never reassigned
/// while it is still live for another detection (§4.4).
pub async fn try_reacquire(
    store: &dyn TrackStore,
    patches: &DeadPatchCache,
    live_ids: &HashSet<u32>,
    video_id: &str,
    current_frame_index: u64,
    fps: f64,
    detection_bbox: BBox,
    detection_patch: Option<&Mat>,
    config: &TrackerConfig,
) -> anyhow::Result<Option<u32>> {
    let window_frames = config.reacq_window_frames(fps);
    let candidates = store
        .scan_recent_dead(video_id, current_frame_index, window_frames)
        .await?;

    let mut best: Option<(u32, f64)> = None;
    for candidate in &candidates {
        if live_ids.contains(&candidate.track_id) {
            continue;
        }
        if candidate.last_frame_index().map_or(true, |f| f >= current_frame_index) {
            continue;
        }
        let Some(last_obs) = candidate.last_observation() else {
            continue;
        };

        let score = match (detection_patch, patches.get(candidate.track_id)) {
            (Some(det_patch), Some(cand_patch)) => match patch_ssim(cand_patch, det_patch) {
                Ok(s) if s > config.ssim_threshold_reacq => Some(s),
                _ => None,
            },
            _ => {
                let iou = last_obs.bbox.iou(&detection_bbox);
                if iou > config.iou_threshold_reacq {
                    Some(iou)
                } else {
                    None
                }
            }
        };

        if let Some(score) = score {
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate.track_id, score));
            }
        }
    }

    Ok(best.map(|(track_id, _)| track_id))
}

/// Helper for tests/callers that already have the candidate list (avoids a
/// second store round-trip when the caller fetched it for other reasons).
/// Excludes any candidate whose id is in `live_ids`, same as [`try_reacquire`].
pub fn best_match(
    candidates: &[PersistentTrack],
    patches: &DeadPatchCache,
    live_ids: &HashSet<u32>,
    current_frame_index: u64,
    detection_bbox: BBox,
    detection_patch: Option<&Mat>,
    config: &TrackerConfig,
) -> Option<u32> {
    let mut best: Option<(u32, f64)> = None;
    for candidate in candidates {
        if live_ids.contains(&candidate.track_id) {
            continue;
        }
        if candidate.last_frame_index().map_or(true, |f| f >= current_frame_index) {
            continue;
        }
        let Some(last_obs) = candidate.last_observation() else {
            continue;
        };
        let score = match (detection_patch, patches.get(candidate.track_id)) {
            (Some(det_patch), Some(cand_patch)) => match patch_ssim(cand_patch, det_patch) {
                Ok(s) if s > config.ssim_threshold_reacq => Some(s),
                _ => None,
            },
            _ => {
                let iou = last_obs.bbox.iou(&detection_bbox);
                if iou > config.iou_threshold_reacq {
                    Some(iou)
                } else {
                    None
                }
            }
        };
        if let Some(score) = score {
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate.track_id, score));
            }
        }
    }
    best.map(|(track_id, _)| track_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtrack_models::{FrameObservation, Timestamp};

    fn track_with_last_box(track_id: u32, video_id: &str, frame_index: u64, bbox: BBox) -> PersistentTrack {
        let obs = FrameObservation::detected(frame_index, Timestamp::from_seconds(frame_index as f64 / 10.0), bbox, 0.9);
        PersistentTrack::new(video_id, track_id, obs)
    }

    #[test]
    fn iou_fallback_picks_highest_overlap() {
        let config = TrackerConfig::default();
        let patches = DeadPatchCache::new();
        let candidates = vec![
            track_with_last_box(1, "v", 5, BBox::new(0.0, 0.0, 10.0, 10.0)),
            track_with_last_box(2, "v", 5, BBox::new(100.0, 100.0, 110.0, 110.0)),
        ];
        let detection = BBox::new(1.0, 1.0, 11.0, 11.0);
        let live_ids = HashSet::new();
        let result = best_match(&candidates, &patches, &live_ids, 6, detection, None, &config);
        assert_eq!(result, Some(1));
    }

    #[test]
    fn no_candidate_meets_threshold_returns_none() {
        let config = TrackerConfig::default();
        let patches = DeadPatchCache::new();
        let candidates = vec![track_with_last_box(1, "v", 5, BBox::new(0.0, 0.0, 10.0, 10.0))];
        let detection = BBox::new(500.0, 500.0, 510.0, 510.0);
        let live_ids = HashSet::new();
        let result = best_match(&candidates, &patches, &live_ids, 6, detection, None, &config);
        assert_eq!(result, None);
    }

    #[test]
    fn candidate_observed_after_current_frame_is_ignored() {
        let config = TrackerConfig::default();
        let patches = DeadPatchCache::new();
        let candidates = vec![track_with_last_box(1, "v", 10, BBox::new(0.0, 0.0, 10.0, 10.0))];
        let detection = BBox::new(1.0, 1.0, 11.0, 11.0);
        let live_ids = HashSet::new();
        let result = best_match(&candidates, &patches, &live_ids, 5, detection, None, &config);
        assert_eq!(result, None);
    }
}
