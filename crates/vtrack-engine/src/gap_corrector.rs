//! C6: Gap Corrector. Post-pass over a finished track: fills sub-threshold
//! temporal gaps by linear interpolation, leaving true disappearances alone.

use vtrack_models::{BBox, FrameObservation, PersistentTrack, Timestamp};

/// Sort `frames` by `frame_index` and fill any gap `0 < gap <=
/// jitter_threshold_frames` with linearly interpolated observations marked
/// `interpolated = true, jitter_corrected = true` (§4.6). Gaps larger than
/// the threshold are left untouched — they represent a true disappearance.
/// Returns the observations that were inserted (for the caller to persist
/// via `upsert_observation`, which this function does not call itself).
pub fn correct(track: &mut PersistentTrack, jitter_threshold_frames: u64) -> Vec<FrameObservation> {
    track.sort_frames();

    let mut inserted = Vec::new();
    let mut i = 0;
    while i + 1 < track.frames.len() {
        let (left, right) = (&track.frames[i], &track.frames[i + 1]);
        let gap = right.frame_index.saturating_sub(left.frame_index).saturating_sub(1);

        if gap > 0 && gap <= jitter_threshold_frames {
            let left_secs = left.timestamp.as_seconds();
            let right_secs = right.timestamp.as_seconds();
            let left_box = left.bbox;
            let right_box = right.bbox;
            let span = (right.frame_index - left.frame_index) as f64;

            for step in 1..=gap {
                let t = step as f64 / span;
                let frame_index = left.frame_index + step;
                let seconds = left_secs + (right_secs - left_secs) * t;
                let bbox = lerp_box(left_box, right_box, t);
                let obs = FrameObservation::jitter_corrected(frame_index, Timestamp::from_seconds(seconds), bbox);
                inserted.push(obs.clone());
                track.frames.insert(i + 1, obs);
                i += 1;
            }
        }
        i += 1;
    }

    track.sort_frames();
    inserted
}

fn lerp_box(a: BBox, b: BBox, t: f64) -> BBox {
    a.lerp(&b, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(frame_index: u64, bbox: BBox) -> FrameObservation {
        FrameObservation::detected(frame_index, Timestamp::from_seconds(frame_index as f64 / 10.0), bbox, 0.9)
    }

    #[test]
    fn fills_short_gap() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        let mut track = PersistentTrack::new("v", 0, obs(0, b));
        track.frames.push(obs(3, BBox::new(30.0, 0.0, 40.0, 10.0)));

        let inserted = correct(&mut track, 3);
        assert_eq!(inserted.len(), 2);
        assert_eq!(track.frames.len(), 4);
        for (i, f) in track.frames.iter().enumerate() {
            assert_eq!(f.frame_index, i as u64);
        }
        assert!(track.frames[1].jitter_corrected);
        assert!(track.frames[2].jitter_corrected);
    }

    #[test]
    fn leaves_gap_above_threshold() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        let mut track = PersistentTrack::new("v", 0, obs(0, b));
        track.frames.push(obs(10, b));

        let inserted = correct(&mut track, 3);
        assert!(inserted.is_empty());
        assert_eq!(track.frames.len(), 2);
    }

    #[test]
    fn monotone_frame_indices_after_correction() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        let mut track = PersistentTrack::new("v", 0, obs(0, b));
        track.frames.push(obs(2, b));
        track.frames.push(obs(20, b));
        track.frames.push(obs(21, b));

        correct(&mut track, 3);
        for pair in track.frames.windows(2) {
            assert!(pair[0].frame_index < pair[1].frame_index);
        }
    }
}
