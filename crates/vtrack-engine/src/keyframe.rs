//! C2: Keyframe Selector. Decides per frame whether to run detection, using
//! SSIM against the last emitted keyframe, with `keyframe_interval` enforced
//! as an upper bound (DESIGN.md open-question decision).

use opencv::core::Mat;

use crate::config::TrackerConfig;
use crate::error::EngineResult;
use crate::similarity::ssim;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeDecision {
    Keyframe,
    Intermediate,
}

pub struct KeyframeSelector {
    last_keyframe: Option<Mat>,
    frames_since_keyframe: u32,
}

impl KeyframeSelector {
    pub fn new() -> Self {
        Self {
            last_keyframe: None,
            frames_since_keyframe: 0,
        }
    }

    /// Decide whether `gray` should be a keyframe, and update internal state
    /// (the stored keyframe and the forced-interval counter) accordingly.
    pub fn decide(&mut self, gray: &Mat, config: &TrackerConfig) -> EngineResult<KeyframeDecision> {
        let decision = match &self.last_keyframe {
            None => KeyframeDecision::Keyframe,
            Some(prev) => {
                if self.frames_since_keyframe >= config.keyframe_interval {
                    KeyframeDecision::Keyframe
                } else {
                    let score = ssim(prev, gray)?;
                    if score < config.ssim_threshold {
                        KeyframeDecision::Keyframe
                    } else {
                        KeyframeDecision::Intermediate
                    }
                }
            }
        };

        match decision {
            KeyframeDecision::Keyframe => {
                self.last_keyframe = Some(gray.clone());
                self.frames_since_keyframe = 0;
            }
            KeyframeDecision::Intermediate => {
                self.frames_since_keyframe += 1;
            }
        }

        Ok(decision)
    }

    pub fn last_keyframe(&self) -> Option<&Mat> {
        self.last_keyframe.as_ref()
    }
}

impl Default for KeyframeSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC1};

    fn flat(value: f64) -> Mat {
        Mat::new_rows_cols_with_default(32, 32, CV_8UC1, Scalar::all(value)).unwrap()
    }

    #[test]
    fn first_frame_is_always_keyframe() {
        let mut sel = KeyframeSelector::new();
        let config = TrackerConfig::default();
        let decision = sel.decide(&flat(100.0), &config).unwrap();
        assert_eq!(decision, KeyframeDecision::Keyframe);
    }

    #[test]
    fn identical_frame_is_intermediate() {
        let mut sel = KeyframeSelector::new();
        let config = TrackerConfig::default();
        sel.decide(&flat(100.0), &config).unwrap();
        let decision = sel.decide(&flat(100.0), &config).unwrap();
        assert_eq!(decision, KeyframeDecision::Intermediate);
    }

    #[test]
    fn very_different_frame_is_keyframe() {
        let mut sel = KeyframeSelector::new();
        let config = TrackerConfig::default();
        sel.decide(&flat(0.0), &config).unwrap();
        let decision = sel.decide(&flat(255.0), &config).unwrap();
        assert_eq!(decision, KeyframeDecision::Keyframe);
    }

    #[test]
    fn keyframe_interval_forces_keyframe() {
        let mut sel = KeyframeSelector::new();
        let mut config = TrackerConfig::default();
        config.keyframe_interval = 2;
        sel.decide(&flat(100.0), &config).unwrap(); // keyframe 0
        sel.decide(&flat(100.0), &config).unwrap(); // intermediate, counter=1
        let decision = sel.decide(&flat(100.0), &config).unwrap(); // counter==interval -> forced
        assert_eq!(decision, KeyframeDecision::Keyframe);
    }
}
