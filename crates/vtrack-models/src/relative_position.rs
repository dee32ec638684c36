//! Derived quadrant/region label for a detection within its frame.
//!
//! Not part of any matching or identity decision — a purely informational
//! field carried on `FrameObservation` for downstream consumers.

use serde::{Deserialize, Serialize};

use crate::geometry::BBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelativePosition {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl RelativePosition {
    /// Classify a box's center into a 3x3 region of a `width x height` frame.
    pub fn classify(b: &BBox, width: f64, height: f64) -> Option<Self> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let (cx, cy) = b.center();
        let col = ((cx / width) * 3.0).floor().clamp(0.0, 2.0) as u8;
        let row = ((cy / height) * 3.0).floor().clamp(0.0, 2.0) as u8;
        use RelativePosition::*;
        Some(match (row, col) {
            (0, 0) => TopLeft,
            (0, 1) => TopCenter,
            (0, 2) => TopRight,
            (1, 0) => MiddleLeft,
            (1, 1) => Center,
            (1, 2) => MiddleRight,
            (2, 0) => BottomLeft,
            (2, 1) => BottomCenter,
            _ => BottomRight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_center() {
        let b = BBox::new(450.0, 450.0, 550.0, 550.0);
        assert_eq!(RelativePosition::classify(&b, 1000.0, 1000.0), Some(RelativePosition::Center));
    }

    #[test]
    fn classifies_top_left() {
        let b = BBox::new(0.0, 0.0, 50.0, 50.0);
        assert_eq!(RelativePosition::classify(&b, 1000.0, 1000.0), Some(RelativePosition::TopLeft));
    }

    #[test]
    fn classifies_bottom_right() {
        let b = BBox::new(950.0, 950.0, 999.0, 999.0);
        assert_eq!(RelativePosition::classify(&b, 1000.0, 1000.0), Some(RelativePosition::BottomRight));
    }

    #[test]
    fn degenerate_frame_returns_none() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(RelativePosition::classify(&b, 0.0, 0.0), None);
    }
}
