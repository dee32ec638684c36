//! A single per-frame appearance of a track, once it has been appended.

use serde::{Deserialize, Serialize};

use crate::geometry::BBox;
use crate::relative_position::RelativePosition;
use crate::timestamp::Timestamp;

/// One observation of a track at a given frame. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    pub frame_index: u64,
    pub timestamp: Timestamp,
    #[serde(rename = "box")]
    pub bbox: BBox,
    pub confidence: Option<f32>,
    #[serde(default)]
    pub interpolated: bool,
    #[serde(default)]
    pub jitter_corrected: bool,
    #[serde(default)]
    pub relative_position: Option<RelativePosition>,
}

impl FrameObservation {
    pub fn detected(frame_index: u64, timestamp: Timestamp, bbox: BBox, confidence: f32) -> Self {
        Self {
            frame_index,
            timestamp,
            bbox,
            confidence: Some(confidence),
            interpolated: false,
            jitter_corrected: false,
            relative_position: None,
        }
    }

    pub fn interpolated(frame_index: u64, timestamp: Timestamp, bbox: BBox) -> Self {
        Self {
            frame_index,
            timestamp,
            bbox,
            confidence: None,
            interpolated: true,
            jitter_corrected: false,
            relative_position: None,
        }
    }

    pub fn jitter_corrected(frame_index: u64, timestamp: Timestamp, bbox: BBox) -> Self {
        Self {
            frame_index,
            timestamp,
            bbox,
            confidence: None,
            interpolated: true,
            jitter_corrected: true,
            relative_position: None,
        }
    }

    pub fn with_relative_position(mut self, pos: Option<RelativePosition>) -> Self {
        self.relative_position = pos;
        self
    }
}
