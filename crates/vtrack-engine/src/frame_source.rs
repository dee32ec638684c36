//! C1: Frame Source. Decodes a video into a finite, non-restartable sequence
//! of frames with monotonically increasing `frame_index` starting at 0.

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::{core, imgproc};

use crate::error::{EngineError, EngineResult};

const FALLBACK_FPS: f64 = 30.0;

/// One decoded frame: color (detection, annotation) and grayscale
/// (similarity, flow), plus its presentation timestamp.
pub struct Frame {
    pub index: u64,
    pub timestamp_ms: u64,
    pub color: Mat,
    pub gray: Mat,
}

/// Decodes frames from a video file, substituting `fps = 30` when the
/// container reports `0` (§4.1).
pub struct FrameSource {
    capture: VideoCapture,
    fps: f64,
    width: i32,
    height: i32,
    next_index: u64,
}

impl FrameSource {
    pub fn open(path: &str) -> EngineResult<Self> {
        let capture = VideoCapture::from_file(path, videoio::CAP_ANY)
            .map_err(|e| EngineError::video_open(e.to_string()))?;
        let opened = capture.is_opened().map_err(|e| EngineError::video_open(e.to_string()))?;
        if !opened {
            return Err(EngineError::video_open(format!("cannot open video: {path}")));
        }

        let reported_fps = capture
            .get(videoio::CAP_PROP_FPS)
            .map_err(|e| EngineError::video_open(e.to_string()))?;
        let fps = if reported_fps <= 0.0 { FALLBACK_FPS } else { reported_fps };

        let width = capture
            .get(videoio::CAP_PROP_FRAME_WIDTH)
            .map_err(|e| EngineError::video_open(e.to_string()))? as i32;
        let height = capture
            .get(videoio::CAP_PROP_FRAME_HEIGHT)
            .map_err(|e| EngineError::video_open(e.to_string()))? as i32;

        Ok(Self {
            capture,
            fps,
            width,
            height,
            next_index: 0,
        })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Decode and return the next frame, or `None` once the stream is exhausted.
    pub fn next_frame(&mut self) -> EngineResult<Option<Frame>> {
        let mut color = Mat::default();
        let read = self
            .capture
            .read(&mut color)
            .map_err(|e| EngineError::decode(e.to_string()))?;
        if !read || color.empty() {
            return Ok(None);
        }

        let mut gray = Mat::default();
        imgproc::cvt_color(
            &color,
            &mut gray,
            imgproc::COLOR_BGR2GRAY,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| EngineError::decode(e.to_string()))?;

        let index = self.next_index;
        self.next_index += 1;
        let timestamp_ms = ((index * 1000) as f64 / self.fps).round() as u64;

        Ok(Some(Frame {
            index,
            timestamp_ms,
            color,
            gray,
        }))
    }
}
