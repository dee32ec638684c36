//! Structural Similarity (SSIM) between two same-size grayscale images,
//! luma-only, 7x7 Gaussian window, default constants (§4.2). Required over a
//! plain mean-intensity-difference measure, which the spec calls out as
//! insufficient.

use opencv::core::{Mat, Size, CV_32F};
use opencv::prelude::*;
use opencv::{core, imgproc};

use crate::error::{EngineError, EngineResult};

const WINDOW: i32 = 7;
const SIGMA: f64 = 1.5;
/// `(K1 * L)^2`, `(K2 * L)^2` with `L = 255` (8-bit dynamic range), the
/// standard SSIM stabilization constants.
const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Mean SSIM over the whole image, in `[-1, 1]`. Both inputs must be
/// single-channel (grayscale) and the same size; callers resize first.
pub fn ssim(a: &Mat, b: &Mat) -> EngineResult<f64> {
    if a.size().map_err(|e| EngineError::decode(e.to_string()))?
        != b.size().map_err(|e| EngineError::decode(e.to_string()))?
    {
        return Err(EngineError::decode("ssim: size mismatch".to_string()));
    }

    let mut af = Mat::default();
    let mut bf = Mat::default();
    a.convert_to(&mut af, CV_32F, 1.0, 0.0)
        .map_err(|e| EngineError::decode(e.to_string()))?;
    b.convert_to(&mut bf, CV_32F, 1.0, 0.0)
        .map_err(|e| EngineError::decode(e.to_string()))?;

    let blur = |src: &Mat| -> EngineResult<Mat> {
        let mut out = Mat::default();
        imgproc::gaussian_blur(
            src,
            &mut out,
            Size::new(WINDOW, WINDOW),
            SIGMA,
            SIGMA,
            core::BORDER_REFLECT,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| EngineError::decode(e.to_string()))?;
        Ok(out)
    };

    let mu_a = blur(&af)?;
    let mu_b = blur(&bf)?;

    let mut mu_a2 = Mat::default();
    let mut mu_b2 = Mat::default();
    let mut mu_ab = Mat::default();
    core::multiply(&mu_a, &mu_a, &mut mu_a2, 1.0, -1).map_err(|e| EngineError::decode(e.to_string()))?;
    core::multiply(&mu_b, &mu_b, &mut mu_b2, 1.0, -1).map_err(|e| EngineError::decode(e.to_string()))?;
    core::multiply(&mu_a, &mu_b, &mut mu_ab, 1.0, -1).map_err(|e| EngineError::decode(e.to_string()))?;

    let mut a2 = Mat::default();
    let mut b2 = Mat::default();
    let mut ab = Mat::default();
    core::multiply(&af, &af, &mut a2, 1.0, -1).map_err(|e| EngineError::decode(e.to_string()))?;
    core::multiply(&bf, &bf, &mut b2, 1.0, -1).map_err(|e| EngineError::decode(e.to_string()))?;
    core::multiply(&af, &bf, &mut ab, 1.0, -1).map_err(|e| EngineError::decode(e.to_string()))?;

    let mut sigma_a2 = Mat::default();
    let mut sigma_b2 = Mat::default();
    let mut sigma_ab = Mat::default();
    core::subtract(&blur(&a2)?, &mu_a2, &mut sigma_a2, &core::no_array(), -1)
        .map_err(|e| EngineError::decode(e.to_string()))?;
    core::subtract(&blur(&b2)?, &mu_b2, &mut sigma_b2, &core::no_array(), -1)
        .map_err(|e| EngineError::decode(e.to_string()))?;
    core::subtract(&blur(&ab)?, &mu_ab, &mut sigma_ab, &core::no_array(), -1)
        .map_err(|e| EngineError::decode(e.to_string()))?;

    // ssim_map = ((2*mu_ab + C1) * (2*sigma_ab + C2)) / ((mu_a2 + mu_b2 + C1) * (sigma_a2 + sigma_b2 + C2))
    let rows = mu_a.rows();
    let cols = mu_a.cols();
    let mut sum = 0.0f64;
    let mut count = 0u64;
    for r in 0..rows {
        for c in 0..cols {
            let ma: f32 = *mu_a.at_2d(r, c).map_err(|e| EngineError::decode(e.to_string()))?;
            let mb: f32 = *mu_b.at_2d(r, c).map_err(|e| EngineError::decode(e.to_string()))?;
            let va: f32 = *sigma_a2.at_2d(r, c).map_err(|e| EngineError::decode(e.to_string()))?;
            let vb: f32 = *sigma_b2.at_2d(r, c).map_err(|e| EngineError::decode(e.to_string()))?;
            let cab: f32 = *sigma_ab.at_2d(r, c).map_err(|e| EngineError::decode(e.to_string()))?;
            let (ma, mb, va, vb, cab) = (ma as f64, mb as f64, va as f64, vb as f64, cab as f64);
            let numerator = (2.0 * ma * mb + C1) * (2.0 * cab + C2);
            let denominator = (ma * ma + mb * mb + C1) * (va + vb + C2);
            if denominator > 0.0 {
                sum += numerator / denominator;
                count += 1;
            }
        }
    }

    if count == 0 {
        return Ok(1.0);
    }
    Ok((sum / count as f64).clamp(-1.0, 1.0))
}

/// Resize `mat` to `(width, height)` with area interpolation (used when
/// comparing sub-images of different sizes, §4.4).
pub fn resize_to(mat: &Mat, width: i32, height: i32) -> EngineResult<Mat> {
    let mut out = Mat::default();
    imgproc::resize(
        mat,
        &mut out,
        Size::new(width.max(1), height.max(1)),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )
    .map_err(|e| EngineError::decode(e.to_string()))?;
    Ok(out)
}

/// Convert a (possibly color) patch to single-channel grayscale. A no-op if
/// `mat` is already single-channel.
fn to_gray(mat: &Mat) -> EngineResult<Mat> {
    if mat.channels() == 1 {
        return Ok(mat.clone());
    }
    let mut out = Mat::default();
    imgproc::cvt_color(mat, &mut out, imgproc::COLOR_BGR2GRAY, 0, core::AlgorithmHint::ALGO_HINT_DEFAULT)
        .map_err(|e| EngineError::decode(e.to_string()))?;
    Ok(out)
}

/// SSIM between two patches of potentially different sizes: both are
/// grayscaled and resized to their common minimum `(w, h)` first (§4.4
/// step 2 — "resize both patches to their common minimum (w, h), grayscale,
/// compute SSIM").
pub fn patch_ssim(a: &Mat, b: &Mat) -> EngineResult<f64> {
    let sa = a.size().map_err(|e| EngineError::decode(e.to_string()))?;
    let sb = b.size().map_err(|e| EngineError::decode(e.to_string()))?;
    let w = sa.width.min(sb.width);
    let h = sa.height.min(sb.height);
    if w <= 0 || h <= 0 {
        return Err(EngineError::decode("patch_ssim: degenerate patch".to_string()));
    }
    let ga = to_gray(a)?;
    let gb = to_gray(b)?;
    let ra = resize_to(&ga, w, h)?;
    let rb = resize_to(&gb, w, h)?;
    ssim(&ra, &rb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Mat, Scalar, CV_8UC1};

    #[test]
    fn identical_images_score_near_one() {
        let m = Mat::new_rows_cols_with_default(32, 32, CV_8UC1, Scalar::all(128.0)).unwrap();
        let score = ssim(&m, &m).unwrap();
        assert!(score > 0.99, "got {score}");
    }

    #[test]
    fn very_different_images_score_lower() {
        let a = Mat::new_rows_cols_with_default(32, 32, CV_8UC1, Scalar::all(0.0)).unwrap();
        let b = Mat::new_rows_cols_with_default(32, 32, CV_8UC1, Scalar::all(255.0)).unwrap();
        let score = ssim(&a, &b).unwrap();
        assert!(score < 0.5, "got {score}");
    }
}
