//! C3: Data Associator + Tracker. Maintains the live track set, matches new
//! detections against it via IoU + Hungarian assignment, and births/kills
//! identities (consulting C4 before minting a new one).

use std::collections::HashSet;

use opencv::core::{Mat, Rect};
use opencv::prelude::*;

use vtrack_models::{BBox, Detection, FrameObservation, RelativePosition, Timestamp};

use crate::assignment;
use crate::collaborators::TrackStore;
use crate::config::TrackerConfig;
use crate::live_track::{LiveTrack, TrackStatus};
use crate::reacquire::{self, DeadPatchCache};

pub struct DataAssociator {
    tracks: Vec<LiveTrack>,
    next_track_id: u32,
    dead_patches: DeadPatchCache,
    frames_processed: u64,
}

/// One track emitted for a keyframe: the id and the box that was written to
/// the store for this frame.
#[derive(Debug, Clone, Copy)]
pub struct Emission {
    pub track_id: u32,
    pub bbox: BBox,
}

impl DataAssociator {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            next_track_id: 0,
            dead_patches: DeadPatchCache::new(),
            frames_processed: 0,
        }
    }

    /// Live `track_id`s, for the motion interpolator to propagate on
    /// intermediate frames.
    pub fn live_track_ids_and_boxes(&self) -> Vec<(u32, BBox)> {
        self.tracks.iter().map(|t| (t.track_id, t.bbox())).collect()
    }

    /// Total number of identities minted so far, live or retired. Track ids
    /// are assigned sequentially from 0, so `0..track_count()` enumerates
    /// every track the job has touched — used by the post-pass gap
    /// corrector, which must also visit identities that died mid-job.
    pub fn track_count(&self) -> u32 {
        self.next_track_id
    }

    /// Advance a live track's box without a detection (used by the motion
    /// interpolator to keep the tracker's internal notion of "last box"
    /// aligned with the interpolated position between keyframes).
    pub fn nudge(&mut self, track_id: u32, bbox: BBox) {
        if let Some(track) = self.tracks.iter_mut().find(|t| t.track_id == track_id) {
            track.set_bbox(bbox);
        }
    }

    /// Run one keyframe's worth of association (§4.3 steps 1-7). Returns the
    /// boxes emitted for tracks with `hits >= min_hits` (or still within the
    /// job's first `min_hits` frames), after persisting them via `store`.
    #[allow(clippy::too_many_arguments)]
    pub async fn process_keyframe(
        &mut self,
        detections: Vec<Detection>,
        color: &Mat,
        frame_index: u64,
        timestamp: Timestamp,
        fps: f64,
        frame_w: f64,
        frame_h: f64,
        video_id: &str,
        store: &dyn TrackStore,
        config: &TrackerConfig,
    ) -> anyhow::Result<Vec<Emission>> {
        self.frames_processed += 1;
        self.dead_patches.prune(frame_index, config.reacq_window_frames(fps).max(1));

        // 1. Predict.
        let predicted: Vec<BBox> = self.tracks.iter_mut().map(|t| t.predict()).collect();

        // 2. Score.
        let iou_matrix: Vec<Vec<f64>> = detections
            .iter()
            .map(|d| predicted.iter().map(|p| d.bbox.iou(p)).collect())
            .collect();

        // 3. Assign.
        let raw_assignment = assignment::solve(&iou_matrix);
        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut matched_dets = vec![false; detections.len()];
        let mut matches = Vec::new();
        for a in raw_assignment {
            if a.iou >= config.iou_threshold {
                matched_tracks[a.track_idx] = true;
                matched_dets[a.detection_idx] = true;
                matches.push(a);
            }
        }

        // 4. Update matched. Refresh each matched track's patch too, so a
        // later re-acquisition compares against its *last observed*
        // sub-image (§4.4 step 2), not its birth appearance.
        for a in &matches {
            let det = &detections[a.detection_idx];
            self.tracks[a.track_idx].update(det.bbox, config);
            self.tracks[a.track_idx].set_patch(extract_patch(color, det.bbox));
        }

        // 5. Age unmatched tracks; remove those that exceeded max_age.
        let mut retired = Vec::new();
        for (idx, track) in self.tracks.iter_mut().enumerate() {
            if !matched_tracks[idx] {
                track.bump_miss(config);
                if track.misses > config.max_age {
                    retired.push(idx);
                }
            }
        }
        for idx in retired.into_iter().rev() {
            let track = self.tracks.remove(idx);
            if let Some(patch) = track.last_patch {
                self.dead_patches.remember(track.track_id, patch, frame_index.saturating_sub(1));
            }
        }

        // 6. Birth unmatched detections (via re-acquisition first). A
        // candidate must never be an id that is currently live — including
        // one just reacquired by an earlier detection in this same frame
        // (§4.4: "never returns a live track; never reassigns an identity
        // that is currently live for another detection in the same frame").
        let mut live_ids: HashSet<u32> = self.tracks.iter().map(|t| t.track_id).collect();
        for (det_idx, det) in detections.iter().enumerate() {
            if matched_dets[det_idx] {
                continue;
            }
            let patch = extract_patch(color, det.bbox);
            let reacquired = reacquire::try_reacquire(
                store,
                &self.dead_patches,
                &live_ids,
                video_id,
                frame_index,
                fps,
                det.bbox,
                patch.as_ref(),
                config,
            )
            .await?;

            let track_id = match reacquired {
                Some(id) => id,
                None => {
                    let id = self.next_track_id;
                    self.next_track_id += 1;
                    id
                }
            };
            live_ids.insert(track_id);

            let mut track = LiveTrack::new(track_id, det.bbox, patch);
            // A re-acquired identity already has hits from before it died;
            // the spec treats the live representation as fresh in-memory
            // state, so it still needs `min_hits` keyframe matches before
            // being promoted to Confirmed in *this* continuation, same as
            // any birth.
            if reacquired.is_some() {
                track.status = TrackStatus::Confirmed;
            }
            self.tracks.push(track);
        }

        // 7. Emit.
        let mut emissions = Vec::new();
        let within_warmup = self.frames_processed <= config.min_hits as u64;
        for track in &self.tracks {
            let eligible = track.status == TrackStatus::Confirmed
                || track.hits >= config.min_hits
                || within_warmup;
            if !eligible {
                continue;
            }
            let bbox = track.bbox();
            emissions.push(Emission { track_id: track.track_id, bbox });

            let relative_position = RelativePosition::classify(&bbox, frame_w, frame_h);
            let obs = FrameObservation::detected(frame_index, timestamp, bbox, detection_confidence(&detections, bbox))
                .with_relative_position(relative_position);
            store.upsert_observation(video_id, track.track_id, obs).await?;
        }

        Ok(emissions)
    }
}

impl Default for DataAssociator {
    fn default() -> Self {
        Self::new()
    }
}

fn detection_confidence(detections: &[Detection], bbox: BBox) -> f32 {
    detections
        .iter()
        .max_by(|a, b| {
            let ia = a.bbox.iou(&bbox);
            let ib = b.bbox.iou(&bbox);
            ia.partial_cmp(&ib).unwrap()
        })
        .map(|d| d.confidence)
        .unwrap_or(0.0)
}

fn extract_patch(color: &Mat, bbox: BBox) -> Option<Mat> {
    let width = color.cols();
    let height = color.rows();
    let clamped = bbox.clamp_to(width as f64, height as f64);
    let x = clamped.x1.max(0.0) as i32;
    let y = clamped.y1.max(0.0) as i32;
    let w = (clamped.width() as i32).max(1).min(width - x);
    let h = (clamped.height() as i32).max(1).min(height - y);
    if w <= 0 || h <= 0 {
        return None;
    }
    let rect = Rect::new(x, y, w, h);
    Mat::roi(color, rect).ok().map(|m| m.try_clone().unwrap_or(m))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use opencv::core::CV_8UC3;

    use vtrack_models::Detection;

    use super::*;

    struct FakeStore {
        tracks: Mutex<std::collections::HashMap<(String, u32), vtrack_models::PersistentTrack>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self { tracks: Mutex::new(std::collections::HashMap::new()) }
        }
    }

    #[async_trait]
    impl TrackStore for FakeStore {
        async fn upsert_observation(
            &self,
            video_id: &str,
            track_id: u32,
            obs: FrameObservation,
        ) -> anyhow::Result<()> {
            let mut tracks = self.tracks.lock().unwrap();
            tracks
                .entry((video_id.to_string(), track_id))
                .and_modify(|t| {
                    t.append_if_new(obs.clone());
                })
                .or_insert_with(|| vtrack_models::PersistentTrack::new(video_id, track_id, obs));
            Ok(())
        }

        async fn scan_recent_dead(
            &self,
            _video_id: &str,
            _before_frame: u64,
            _window_frames: u64,
        ) -> anyhow::Result<Vec<vtrack_models::PersistentTrack>> {
            Ok(Vec::new())
        }

        async fn get_track(
            &self,
            video_id: &str,
            track_id: u32,
        ) -> anyhow::Result<Option<vtrack_models::PersistentTrack>> {
            Ok(self.tracks.lock().unwrap().get(&(video_id.to_string(), track_id)).cloned())
        }
    }

    fn blank_frame(w: i32, h: i32) -> Mat {
        Mat::new_rows_cols_with_default(h, w, CV_8UC3, opencv::core::Scalar::all(0.0)).unwrap()
    }

    fn det(bbox: BBox) -> Detection {
        Detection { bbox, confidence: 0.8, class_label: None }
    }

    #[tokio::test]
    async fn new_detection_births_a_track_and_emits_after_warmup() {
        let store = FakeStore::new();
        let config = TrackerConfig::default();
        let mut associator = DataAssociator::new();
        let frame = blank_frame(100, 100);

        let r1 = associator
            .process_keyframe(
                vec![det(BBox::new(0.0, 0.0, 10.0, 10.0))],
                &frame,
                0,
                Timestamp::from_seconds(0.0),
                30.0,
                100.0,
                100.0,
                "v1",
                &store,
                &config,
            )
            .await
            .unwrap();
        // First frame is within warmup, so it emits immediately even though
        // the track only has one hit.
        assert_eq!(r1.len(), 1);

        let r2 = associator
            .process_keyframe(
                vec![det(BBox::new(1.0, 1.0, 11.0, 11.0))],
                &frame,
                1,
                Timestamp::from_seconds(0.1),
                30.0,
                100.0,
                100.0,
                "v1",
                &store,
                &config,
            )
            .await
            .unwrap();
        assert_eq!(r2.len(), 1);
        assert_eq!(r2[0].track_id, r1[0].track_id);

        let track = store.get_track("v1", r1[0].track_id).await.unwrap().unwrap();
        assert_eq!(track.frames.len(), 2);
    }

    #[tokio::test]
    async fn track_retires_after_max_age_consecutive_misses() {
        let store = FakeStore::new();
        let config = TrackerConfig::default();
        let mut associator = DataAssociator::new();
        let frame = blank_frame(100, 100);

        associator
            .process_keyframe(
                vec![det(BBox::new(0.0, 0.0, 10.0, 10.0))],
                &frame,
                0,
                Timestamp::from_seconds(0.0),
                30.0,
                100.0,
                100.0,
                "v1",
                &store,
                &config,
            )
            .await
            .unwrap();

        for frame_index in 1..=(config.max_age as u64 + 2) {
            associator
                .process_keyframe(
                    Vec::new(),
                    &frame,
                    frame_index,
                    Timestamp::from_seconds(frame_index as f64 / 10.0),
                    30.0,
                    100.0,
                    100.0,
                    "v1",
                    &store,
                    &config,
                )
                .await
                .unwrap();
        }

        assert!(associator.live_track_ids_and_boxes().is_empty());
    }

    #[test]
    fn extract_patch_clamps_to_frame_bounds() {
        let frame = blank_frame(50, 50);
        let patch = extract_patch(&frame, BBox::new(-10.0, -10.0, 60.0, 60.0));
        assert!(patch.is_some());
    }
}
