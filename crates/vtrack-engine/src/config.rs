//! Tunables for the tracking core (§6 of the design: one env var per key).

use std::env;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Every tunable the tracking core reads, with defaults matching the
/// external-interfaces table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// SSIM threshold below which a frame is promoted to a keyframe.
    pub ssim_threshold: f64,
    /// Minimum IoU for a detection<->track match to be accepted.
    pub iou_threshold: f64,
    /// Frames a track may coast (no match) before retirement.
    pub max_age: u32,
    /// Hits required before a track is Confirmed.
    pub min_hits: u32,
    /// Re-acquisition time window, in seconds.
    pub timeout_seconds_reacq: f64,
    /// Patch SSIM threshold for identity reuse.
    pub ssim_threshold_reacq: f64,
    /// Fallback IoU threshold for identity reuse.
    pub iou_threshold_reacq: f64,
    /// Maximum gap (seconds) linearly interpolated by the gap corrector.
    pub jitter_seconds: f64,
    /// Hard cap: force a keyframe at least every N frames.
    pub keyframe_interval: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ssim_threshold: 0.90,
            iou_threshold: 0.30,
            max_age: 3,
            min_hits: 2,
            timeout_seconds_reacq: 5.0,
            ssim_threshold_reacq: 0.70,
            iou_threshold_reacq: 0.50,
            jitter_seconds: 0.25,
            keyframe_interval: 5,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            ssim_threshold: env_parse("TRACKER_SSIM_THRESHOLD", d.ssim_threshold),
            iou_threshold: env_parse("TRACKER_IOU_THRESHOLD", d.iou_threshold),
            max_age: env_parse("TRACKER_MAX_AGE", d.max_age),
            min_hits: env_parse("TRACKER_MIN_HITS", d.min_hits),
            timeout_seconds_reacq: env_parse("TRACKER_TIMEOUT_SECONDS_REACQ", d.timeout_seconds_reacq),
            ssim_threshold_reacq: env_parse("TRACKER_SSIM_THRESHOLD_REACQ", d.ssim_threshold_reacq),
            iou_threshold_reacq: env_parse("TRACKER_IOU_THRESHOLD_REACQ", d.iou_threshold_reacq),
            jitter_seconds: env_parse("TRACKER_JITTER_SECONDS", d.jitter_seconds),
            keyframe_interval: env_parse("TRACKER_KEYFRAME_INTERVAL", d.keyframe_interval),
        }
    }

    /// `jitter_seconds` expressed in frames at a given `fps` (rounded).
    pub fn jitter_threshold_frames(&self, fps: f64) -> u64 {
        (self.jitter_seconds * fps).round() as u64
    }

    /// `timeout_seconds_reacq` expressed in frames at a given `fps` (rounded).
    pub fn reacq_window_frames(&self, fps: f64) -> u64 {
        (self.timeout_seconds_reacq * fps).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let c = TrackerConfig::default();
        assert_eq!(c.ssim_threshold, 0.90);
        assert_eq!(c.iou_threshold, 0.30);
        assert_eq!(c.max_age, 3);
        assert_eq!(c.min_hits, 2);
        assert_eq!(c.timeout_seconds_reacq, 5.0);
        assert_eq!(c.ssim_threshold_reacq, 0.70);
        assert_eq!(c.iou_threshold_reacq, 0.50);
        assert_eq!(c.jitter_seconds, 0.25);
        assert_eq!(c.keyframe_interval, 5);
    }

    #[test]
    fn jitter_threshold_frames_rounds() {
        let c = TrackerConfig::default();
        assert_eq!(c.jitter_threshold_frames(10.0), 3); // round(0.25*10) = 3
        assert_eq!(c.jitter_threshold_frames(30.0), 8); // round(7.5) = 8
    }

    #[test]
    fn reacq_window_frames() {
        let c = TrackerConfig::default();
        assert_eq!(c.reacq_window_frames(10.0), 50);
    }
}
