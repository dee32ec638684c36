//! Rectangular linear assignment maximizing total IoU (§4.3 step 3), via the
//! Kuhn-Munkres (Hungarian) solver. Detections and tracks are padded to a
//! square matrix with zero-weight dummy entries so the solver (which only
//! handles square inputs) can be used for the rectangular case.

use pathfinding::prelude::{kuhn_munkres, Matrix};

/// IoU scaled to an integer so the solver's `Ord + Zero + Bounded` weight can
/// be satisfied; six digits of precision is ample for an IoU in `[0, 1]`.
const SCALE: f64 = 1_000_000.0;

/// One candidate match emitted by the solver, before the caller applies
/// `iou_threshold` to split it back into unmatched detection/track (§4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub detection_idx: usize,
    pub track_idx: usize,
    pub iou: f64,
}

/// Solve the assignment maximizing total IoU. `iou[d][t]` is the
/// detection-d/track-t IoU matrix; returns one `Assignment` per matched pair
/// (every real detection and real track gets at most one entry; entries
/// against the padding are dropped).
pub fn solve(iou: &[Vec<f64>]) -> Vec<Assignment> {
    let n_det = iou.len();
    if n_det == 0 {
        return Vec::new();
    }
    let n_trk = iou[0].len();
    if n_trk == 0 {
        return Vec::new();
    }

    let n = n_det.max(n_trk);
    let matrix = Matrix::from_fn(n, n, |(r, c)| {
        if r < n_det && c < n_trk {
            (iou[r][c] * SCALE).round() as i64
        } else {
            0
        }
    });

    let (_, assignment) = kuhn_munkres(&matrix);

    assignment
        .into_iter()
        .enumerate()
        .filter(|&(det_idx, track_idx)| det_idx < n_det && track_idx < n_trk)
        .map(|(detection_idx, track_idx)| Assignment {
            detection_idx,
            track_idx,
            iou: iou[detection_idx][track_idx],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_yield_no_assignment() {
        assert!(solve(&[]).is_empty());
        assert!(solve(&[vec![]]).is_empty());
    }

    #[test]
    fn square_matrix_prefers_maximum_total_iou() {
        // det0 best matches trk1, det1 best matches trk0: the maximizing
        // assignment should swap rather than greedily taking det0's best.
        let iou = vec![vec![0.2, 0.9], vec![0.8, 0.1]];
        let result = solve(&iou);
        assert_eq!(result.len(), 2);
        let by_det: std::collections::HashMap<_, _> =
            result.iter().map(|a| (a.detection_idx, a.track_idx)).collect();
        assert_eq!(by_det[&0], 1);
        assert_eq!(by_det[&1], 0);
    }

    #[test]
    fn more_detections_than_tracks_leaves_one_unmatched() {
        let iou = vec![vec![0.9], vec![0.1]];
        let result = solve(&iou);
        // Only one track exists; only one detection can be matched to it.
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].detection_idx, 0);
        assert_eq!(result[0].track_idx, 0);
    }
}
