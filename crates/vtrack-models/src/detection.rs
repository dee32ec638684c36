//! The detector's per-frame output.

use serde::{Deserialize, Serialize};

use crate::geometry::BBox;

/// One detection produced by the external object detector for a single frame.
/// Ephemeral — never stored directly, only folded into a `FrameObservation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
    /// Informational only; never participates in matching, hashing, or the track key.
    pub class_label: Option<String>,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f32) -> Self {
        Self {
            bbox,
            confidence: confidence.clamp(0.0, 1.0),
            class_label: None,
        }
    }

    pub fn with_class_label(mut self, label: impl Into<String>) -> Self {
        self.class_label = Some(label.into());
        self
    }
}
