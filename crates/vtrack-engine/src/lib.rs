//! The per-video tracking engine: the six leaf components (C1-C6) that turn a
//! decoded frame stream plus a detector into gap-corrected, persistent object
//! tracks. The Job Runner (in `vtrack-worker`) owns sequencing; this crate
//! owns the algorithms.

pub mod assignment;
pub mod collaborators;
pub mod config;
pub mod detector;
pub mod error;
pub mod frame_source;
pub mod gap_corrector;
pub mod keyframe;
pub mod live_track;
pub mod motion;
pub mod reacquire;
pub mod similarity;
pub mod tracker;

pub use collaborators::{Detector, TrackStore};
pub use config::TrackerConfig;
pub use error::{EngineError, EngineResult};
pub use frame_source::{Frame, FrameSource};
pub use keyframe::{KeyframeDecision, KeyframeSelector};
pub use tracker::DataAssociator;
