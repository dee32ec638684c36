//! The persistent per-identity track document.

use serde::{Deserialize, Serialize};

use crate::observation::FrameObservation;
use crate::timestamp::Timestamp;

/// Document key `{video_id}_{track_id}`.
pub fn track_key(video_id: &str, track_id: u32) -> String {
    format!("{video_id}_{track_id}")
}

/// One persistent per-identity document: `video_id, track_id, start_time, end_time, frames`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentTrack {
    #[serde(rename = "_id")]
    pub id: String,
    pub video_id: String,
    pub track_id: u32,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub frames: Vec<FrameObservation>,
}

impl PersistentTrack {
    pub fn new(video_id: impl Into<String>, track_id: u32, first: FrameObservation) -> Self {
        let video_id = video_id.into();
        let id = track_key(&video_id, track_id);
        let start_time = first.timestamp;
        let end_time = first.timestamp;
        Self {
            id,
            video_id,
            track_id,
            start_time,
            end_time,
            frames: vec![first],
        }
    }

    /// Append an observation unless its `frame_index` is already present (invariant 2).
    /// Returns `true` if the observation was inserted.
    pub fn append_if_new(&mut self, obs: FrameObservation) -> bool {
        if self.frames.iter().any(|f| f.frame_index == obs.frame_index) {
            return false;
        }
        if obs.timestamp.as_seconds() > self.end_time.as_seconds() {
            self.end_time = obs.timestamp;
        }
        if obs.timestamp.as_seconds() < self.start_time.as_seconds() {
            self.start_time = obs.timestamp;
        }
        self.frames.push(obs);
        true
    }

    pub fn last_frame_index(&self) -> Option<u64> {
        self.frames.iter().map(|f| f.frame_index).max()
    }

    pub fn last_observation(&self) -> Option<&FrameObservation> {
        self.frames.iter().max_by_key(|f| f.frame_index)
    }

    /// Sort frames by `frame_index`, in place. Required before gap correction.
    pub fn sort_frames(&mut self) {
        self.frames.sort_by_key(|f| f.frame_index);
    }
}
