//! Shared data model for the object tracking engine.
//!
//! This crate provides Serde-serializable types for:
//! - Bounding boxes and `HH:MM:SS.mmm` timestamps
//! - Detections (ephemeral, detector output) and frame observations (persisted)
//! - Persistent per-identity tracks
//! - The job record exchanged with the job queue / job store

pub mod detection;
pub mod geometry;
pub mod job;
pub mod observation;
pub mod relative_position;
pub mod timestamp;
pub mod track;

pub use detection::Detection;
pub use geometry::BBox;
pub use job::{AnalyzeVideoJob, JobStatus};
pub use observation::FrameObservation;
pub use relative_position::RelativePosition;
pub use timestamp::{seconds_to_ts, ts_to_seconds, Timestamp};
pub use track::{track_key, PersistentTrack};
