//! C5: Motion Interpolator. On intermediate (non-keyframe) frames, propagates
//! each live track's last-keyframe box forward using a single global
//! translation + uniform scale estimated from sparse optical flow, without
//! running the detector.

use opencv::core::{Point2f, Size, TermCriteria, TermCriteria_Type, Vector};
use opencv::prelude::*;
use opencv::{imgproc, video};

use vtrack_models::BBox;

const MAX_FEATURES: i32 = 1000;
const QUALITY_LEVEL: f64 = 0.01;
const MIN_DISTANCE: f64 = 10.0;
const WIN_SIZE: i32 = 21;
const MAX_PYRAMID_LEVEL: i32 = 3;

/// Estimated global motion between two frames: translation of the scene
/// center plus a uniform radial scale (§4.5 step 3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalMotion {
    pub dx: f64,
    pub dy: f64,
    pub scale: f64,
}

impl GlobalMotion {
    pub const IDENTITY: GlobalMotion = GlobalMotion { dx: 0.0, dy: 0.0, scale: 1.0 };

    /// Apply this motion to a box: translate its center by `(dx, dy)`, scale
    /// width/height by `scale` (§4.5 step 4).
    pub fn apply(&self, bbox: &BBox) -> BBox {
        bbox.translate_and_scale(self.dx, self.dy, self.scale)
    }
}

/// Estimate global motion between `prev_gray` and `next_gray` via Shi-Tomasi
/// corners + sparse Lucas-Kanade flow. Returns `None` when there are too few
/// features or too few points survive tracking (§4.5 fallback: caller should
/// then propagate the unchanged last-keyframe box).
pub fn estimate_global_motion(prev_gray: &Mat, next_gray: &Mat) -> Option<GlobalMotion> {
    let mut corners = Vector::<Point2f>::new();
    imgproc::good_features_to_track(
        prev_gray,
        &mut corners,
        MAX_FEATURES,
        QUALITY_LEVEL,
        MIN_DISTANCE,
        &opencv::core::no_array(),
        3,
        false,
        0.04,
    )
    .ok()?;

    if corners.len() < 4 {
        return None;
    }

    let mut next_points = Vector::<Point2f>::new();
    let mut status = Vector::<u8>::new();
    let mut err = Vector::<f32>::new();
    let criteria = TermCriteria::new(
        (TermCriteria_Type::COUNT as i32) | (TermCriteria_Type::EPS as i32),
        30,
        0.01,
    )
    .ok()?;

    video::calc_optical_flow_pyr_lk(
        prev_gray,
        next_gray,
        &corners,
        &mut next_points,
        &mut status,
        &mut err,
        Size::new(WIN_SIZE, WIN_SIZE),
        MAX_PYRAMID_LEVEL,
        criteria,
        0,
        0.001,
    )
    .ok()?;

    let cols = prev_gray.cols() as f64;
    let rows = prev_gray.rows() as f64;
    let center = (cols / 2.0, rows / 2.0);

    let mut dxs = Vec::new();
    let mut dys = Vec::new();
    let mut scales = Vec::new();

    for i in 0..corners.len() {
        if status.get(i).unwrap_or(0) != 1 {
            continue;
        }
        let old = corners.get(i).ok()?;
        let new = next_points.get(i).ok()?;

        dxs.push((new.x - old.x) as f64);
        dys.push((new.y - old.y) as f64);

        let r_old = ((old.x as f64 - center.0).powi(2) + (old.y as f64 - center.1).powi(2)).sqrt();
        let r_new = ((new.x as f64 - center.0).powi(2) + (new.y as f64 - center.1).powi(2)).sqrt();
        if r_old > 1.0 {
            scales.push(r_new / r_old);
        }
    }

    if dxs.len() < 4 {
        return None;
    }

    Some(GlobalMotion {
        dx: median(&mut dxs),
        dy: median(&mut dys),
        scale: if scales.is_empty() { 1.0 } else { median(&mut scales) },
    })
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_motion_leaves_box_unchanged() {
        let bbox = BBox::new(10.0, 10.0, 30.0, 40.0);
        let transformed = GlobalMotion::IDENTITY.apply(&bbox);
        assert!((transformed.x1 - bbox.x1).abs() < 1e-9);
        assert!((transformed.y2 - bbox.y2).abs() < 1e-9);
    }

    #[test]
    fn translation_shifts_center() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let motion = GlobalMotion { dx: 5.0, dy: -5.0, scale: 1.0 };
        let transformed = motion.apply(&bbox);
        let (cx, cy) = transformed.center();
        assert!((cx - 10.0).abs() < 1e-9);
        assert!((cy - 0.0).abs() < 1e-9);
    }

    #[test]
    fn scale_grows_size_about_center() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let motion = GlobalMotion { dx: 0.0, dy: 0.0, scale: 2.0 };
        let transformed = motion.apply(&bbox);
        assert!((transformed.width() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn median_of_odd_and_even_length() {
        assert_eq!(median(&mut [1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&mut [1.0, 2.0, 3.0, 4.0]), 2.5);
    }
}
