//! In-memory live track state (§3 "Track (live)"): a constant-velocity,
//! diagonal-covariance Kalman filter over `[cx, cy, w, h, vx, vy, vw, vh]`
//! (DESIGN.md open-question decision), which subsumes "reuse last box" as the
//! zero-velocity special case.

use std::collections::VecDeque;

use opencv::core::Mat;
use vtrack_models::BBox;

const TRACE_CAPACITY: usize = 10;

/// Per-track process/measurement noise; matches the ambient Kalman tracker's
/// shape (diagonal covariance, not a full state-transition matrix).
const PROCESS_NOISE_POS: f64 = 1.0;
const PROCESS_NOISE_VEL: f64 = 0.1;
const MEASUREMENT_NOISE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Tentative,
    Confirmed,
    Coasting,
}

pub struct LiveTrack {
    pub track_id: u32,
    state: [f64; 8],
    covariance: [f64; 8],
    pub hits: u32,
    pub misses: u32,
    pub trace: VecDeque<BBox>,
    pub status: TrackStatus,
    /// Last observed sub-image, kept for identity re-acquisition's preferred
    /// SSIM path (§4.4 step 2); dropped once the track ages out of the
    /// re-acquisition window.
    pub last_patch: Option<Mat>,
}

impl LiveTrack {
    pub fn new(track_id: u32, bbox: BBox, patch: Option<Mat>) -> Self {
        let (cx, cy) = bbox.center();
        let mut trace = VecDeque::with_capacity(TRACE_CAPACITY);
        trace.push_back(bbox);
        Self {
            track_id,
            state: [cx, cy, bbox.width(), bbox.height(), 0.0, 0.0, 0.0, 0.0],
            covariance: [10.0, 10.0, 10.0, 10.0, 100.0, 100.0, 100.0, 100.0],
            hits: 1,
            misses: 0,
            trace,
            status: TrackStatus::Tentative,
            last_patch: patch,
        }
    }

    /// Advance the constant-velocity model one step (§4.3 step 1).
    pub fn predict(&mut self) -> BBox {
        self.state[0] += self.state[4];
        self.state[1] += self.state[5];
        self.state[2] = (self.state[2] + self.state[6]).max(1.0);
        self.state[3] = (self.state[3] + self.state[7]).max(1.0);

        for i in 0..4 {
            self.covariance[i] += PROCESS_NOISE_POS;
        }
        for i in 4..8 {
            self.covariance[i] += PROCESS_NOISE_VEL;
        }

        self.bbox()
    }

    /// Kalman update with a matched detection box (§4.3 step 4).
    pub fn update(&mut self, bbox: BBox, config: &crate::config::TrackerConfig) {
        let (cx, cy) = bbox.center();
        let measurement = [cx, cy, bbox.width(), bbox.height()];

        let mut gain = [0.0f64; 4];
        for i in 0..4 {
            let innovation_var = self.covariance[i] + MEASUREMENT_NOISE;
            gain[i] = self.covariance[i] / innovation_var;
        }
        for i in 0..4 {
            let innovation = measurement[i] - self.state[i];
            self.state[i] += gain[i] * innovation;
            self.state[i + 4] = gain[i] * innovation;
        }
        for i in 0..4 {
            self.covariance[i] *= 1.0 - gain[i];
        }
        self.state[2] = self.state[2].max(1.0);
        self.state[3] = self.state[3].max(1.0);

        self.hits += 1;
        self.misses = 0;
        if self.trace.len() == TRACE_CAPACITY {
            self.trace.pop_front();
        }
        self.trace.push_back(bbox);

        self.status = if self.hits >= config.min_hits {
            TrackStatus::Confirmed
        } else {
            TrackStatus::Tentative
        };
    }

    /// Replace the last observed sub-image with the patch from the detection
    /// that was just matched to this track, so a future re-acquisition
    /// compares against the track's current appearance rather than its
    /// birth appearance (§4.4 step 2).
    pub fn set_patch(&mut self, patch: Option<Mat>) {
        self.last_patch = patch;
    }

    /// Overwrite the center/size directly without touching velocity, hits, or
    /// status. Used by the motion interpolator (§4.5) to keep the live
    /// track's box aligned with the propagated position on non-keyframe
    /// frames, which must not affect the keyframe-driven state machine.
    pub fn set_bbox(&mut self, bbox: BBox) {
        let (cx, cy) = bbox.center();
        self.state[0] = cx;
        self.state[1] = cy;
        self.state[2] = bbox.width().max(1.0);
        self.state[3] = bbox.height().max(1.0);
        if self.trace.len() == TRACE_CAPACITY {
            self.trace.pop_front();
        }
        self.trace.push_back(bbox);
    }

    pub fn bump_miss(&mut self, config: &crate::config::TrackerConfig) {
        self.misses += 1;
        if self.hits >= config.min_hits {
            self.status = TrackStatus::Coasting;
        }
    }

    pub fn bbox(&self) -> BBox {
        let w = self.state[2].max(1.0);
        let h = self.state[3].max(1.0);
        BBox::new(
            self.state[0] - w / 2.0,
            self.state[1] - h / 2.0,
            self.state[0] + w / 2.0,
            self.state[1] + h / 2.0,
        )
    }

    /// Velocity `(vx, vy)` in pixels/frame, used by the motion interpolator's
    /// fallback when optical flow is degenerate (§4.5).
    pub fn velocity(&self) -> (f64, f64) {
        (self.state[4], self.state[5])
    }

    pub fn is_confirmed_or_was(&self, config: &crate::config::TrackerConfig) -> bool {
        self.hits >= config.min_hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;

    #[test]
    fn new_track_reuses_last_box_with_zero_velocity() {
        let bbox = BBox::new(10.0, 10.0, 50.0, 50.0);
        let mut track = LiveTrack::new(0, bbox, None);
        let predicted = track.predict();
        assert!((predicted.x1 - bbox.x1).abs() < 1e-6);
        assert!((predicted.y1 - bbox.y1).abs() < 1e-6);
    }

    #[test]
    fn update_then_predict_moves_along_velocity() {
        let config = TrackerConfig::default();
        let mut track = LiveTrack::new(0, BBox::new(0.0, 0.0, 10.0, 10.0), None);
        track.update(BBox::new(10.0, 0.0, 20.0, 10.0), &config);
        let predicted = track.predict();
        assert!(predicted.center().0 > 15.0, "expected rightward motion, got {predicted:?}");
    }

    #[test]
    fn confirms_after_min_hits() {
        let config = TrackerConfig::default();
        let mut track = LiveTrack::new(0, BBox::new(0.0, 0.0, 10.0, 10.0), None);
        assert_eq!(track.status, TrackStatus::Tentative);
        track.update(BBox::new(1.0, 0.0, 11.0, 10.0), &config);
        assert_eq!(track.status, TrackStatus::Confirmed);
    }
}
