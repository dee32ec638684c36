//! Drives one video's frame loop (§2 data flow, §4.8): Frame Source ->
//! Keyframe Selector -> (on keyframe) Detector -> Associator; (on
//! intermediate) Motion Interpolator. Gap Corrector runs once after the
//! stream ends. Strictly sequential by `frame_index` (§5).

use std::path::Path;

use tracing::{info, warn};

use vtrack_engine::frame_source::FrameSource;
use vtrack_engine::keyframe::{KeyframeDecision, KeyframeSelector};
use vtrack_engine::tracker::DataAssociator;
use vtrack_engine::{gap_corrector, motion};
use vtrack_models::{Detection, FrameObservation, RelativePosition, Timestamp};

use crate::error::{TrackerError, TrackerResult};
use crate::services::Services;

/// Run the full tracking pipeline for one video. On success every track
/// touched by this job has had its gap-correction pass applied and is
/// readable from the track store.
pub async fn run_job(services: &Services, video_id: &str, video_path: &Path) -> TrackerResult<()> {
    let mut source = FrameSource::open(&video_path.to_string_lossy())
        .map_err(|e| TrackerError::VideoOpenError(e.to_string()))?;
    let fps = source.fps();
    let (width, height) = (source.width() as f64, source.height() as f64);

    let mut keyframes = KeyframeSelector::new();
    let mut associator = DataAssociator::new();
    let mut frame_count = 0u64;

    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => return Err(TrackerError::VideoOpenError(e.to_string())),
        };
        frame_count += 1;
        let timestamp = Timestamp::from_seconds(frame.timestamp_ms as f64 / 1000.0);

        let decision = keyframes
            .decide(&frame.gray, &services.config.tracker)
            .map_err(TrackerError::from)?;

        match decision {
            KeyframeDecision::Keyframe => {
                let detections = infer_with_retry(services, &frame.color, video_id, frame.index).await;
                associator
                    .process_keyframe(
                        detections,
                        &frame.color,
                        frame.index,
                        timestamp,
                        fps,
                        width,
                        height,
                        video_id,
                        services.track_store.as_ref(),
                        &services.config.tracker,
                    )
                    .await
                    .map_err(|e| TrackerError::store_write(e.to_string()))?;
            }
            KeyframeDecision::Intermediate => {
                let global_motion = keyframes
                    .last_keyframe()
                    .and_then(|prev_gray| motion::estimate_global_motion(prev_gray, &frame.gray));

                for (track_id, last_box) in associator.live_track_ids_and_boxes() {
                    let bbox = match global_motion {
                        Some(m) => m.apply(&last_box),
                        None => last_box,
                    };
                    associator.nudge(track_id, bbox);

                    let relative_position = RelativePosition::classify(&bbox, width, height);
                    let obs = FrameObservation::interpolated(frame.index, timestamp, bbox)
                        .with_relative_position(relative_position);
                    services
                        .track_store
                        .upsert_observation(video_id, track_id, obs)
                        .await
                        .map_err(|e| TrackerError::store_write(e.to_string()))?;
                }
            }
        }
    }

    info!(video_id, frame_count, "frame stream exhausted, running gap correction");
    run_gap_correction(services, video_id, &associator, fps).await?;
    Ok(())
}

/// Retry the detector once per frame on failure (§7 `DetectorError`); on a
/// second failure, treat the frame as having zero detections and log.
async fn infer_with_retry(
    services: &Services,
    color_frame: &opencv::core::Mat,
    video_id: &str,
    frame_index: u64,
) -> Vec<Detection> {
    match services.detector.infer(color_frame).await {
        Ok(detections) => return detections,
        Err(e) => warn!(video_id, frame_index, error = %e, "detector call failed, retrying once"),
    }
    match services.detector.infer(color_frame).await {
        Ok(detections) => detections,
        Err(e) => {
            warn!(video_id, frame_index, error = %e, "detector failed twice, treating frame as zero detections");
            Vec::new()
        }
    }
}

/// Post-pass over every identity the job touched (§4.6): fill sub-threshold
/// jitter gaps, leave true disappearances alone.
async fn run_gap_correction(
    services: &Services,
    video_id: &str,
    associator: &DataAssociator,
    fps: f64,
) -> TrackerResult<()> {
    let jitter_threshold_frames = services.config.tracker.jitter_threshold_frames(fps);

    for track_id in 0..associator.track_count() {
        let Some(mut track) = services
            .track_store
            .get_track(video_id, track_id)
            .await
            .map_err(|e| TrackerError::store_write(e.to_string()))?
        else {
            continue;
        };

        let inserted = gap_corrector::correct(&mut track, jitter_threshold_frames);
        for obs in inserted {
            services
                .track_store
                .upsert_observation(video_id, track_id, obs)
                .await
                .map_err(|e| TrackerError::store_write(e.to_string()))?;
        }
    }
    Ok(())
}
