//! Conversion between `PersistentTrack` and the document store's Firestore-shaped
//! documents, plus the `TrackStore` collaborator implementation (§4.7) consumed
//! by the tracking core.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use vtrack_engine::collaborators::TrackStore;
use vtrack_models::{BBox, FrameObservation, PersistentTrack, RelativePosition, Timestamp};

use crate::client::DocStoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{ArrayValue, Document, FromValue, MapValue, ToValue, Value};

const TRACKS_COLLECTION: &str = "tracks";
const MAX_WRITE_RETRIES: u32 = 3;

/// Document-store-backed `TrackStore`: one document per `{video_id}_{track_id}`
/// (§6), with optimistic-concurrency retries on the read-modify-write path and
/// idempotent appends on `(video_id, track_id, frame_index)` (invariant 2).
pub struct FirestoreTrackStore {
    client: DocStoreClient,
}

impl FirestoreTrackStore {
    pub fn new(client: DocStoreClient) -> Self {
        Self { client }
    }

    async fn read_modify_write(
        &self,
        doc_id: &str,
        video_id: &str,
        track_id: u32,
        obs: &FrameObservation,
    ) -> StoreResult<()> {
        for attempt in 0..=MAX_WRITE_RETRIES {
            let existing = self.client.get_document(TRACKS_COLLECTION, doc_id).await?;

            let result = match existing {
                None => {
                    let track = PersistentTrack::new(video_id, track_id, obs.clone());
                    self.client
                        .create_document(TRACKS_COLLECTION, doc_id, track_to_fields(&track))
                        .await
                        .map(|_| ())
                }
                Some(doc) => {
                    let mut track = document_to_track(&doc)?;
                    if !track.append_if_new(obs.clone()) {
                        // Already present: idempotent no-op (invariant 2, testable property 6).
                        return Ok(());
                    }
                    let update_time = doc.update_time.clone().unwrap_or_default();
                    self.client
                        .update_document_with_precondition(
                            TRACKS_COLLECTION,
                            doc_id,
                            track_to_fields(&track),
                            &update_time,
                        )
                        .await
                        .map(|_| ())
                }
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_precondition_failed() && attempt < MAX_WRITE_RETRIES => {
                    debug!(doc_id, attempt, "track upsert lost race, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::request_failed(format!(
            "{doc_id}: exhausted retries on optimistic-concurrency conflict"
        )))
    }
}

#[async_trait]
impl TrackStore for FirestoreTrackStore {
    async fn upsert_observation(
        &self,
        video_id: &str,
        track_id: u32,
        obs: FrameObservation,
    ) -> anyhow::Result<()> {
        let doc_id = vtrack_models::track_key(video_id, track_id);
        self.read_modify_write(&doc_id, video_id, track_id, &obs).await?;
        Ok(())
    }

    async fn scan_recent_dead(
        &self,
        video_id: &str,
        before_frame: u64,
        window_frames: u64,
    ) -> anyhow::Result<Vec<PersistentTrack>> {
        let docs = self.client.list_documents(TRACKS_COLLECTION).await?;
        let mut out = Vec::new();
        for doc in docs {
            let track = match document_to_track(&doc) {
                Ok(t) => t,
                Err(e) => {
                    warn!("skipping malformed track document: {e}");
                    continue;
                }
            };
            if track.video_id != video_id {
                continue;
            }
            let Some(last_frame) = track.last_frame_index() else { continue };
            if last_frame < before_frame && before_frame.saturating_sub(last_frame) <= window_frames {
                out.push(track);
            }
        }
        Ok(out)
    }

    async fn get_track(&self, video_id: &str, track_id: u32) -> anyhow::Result<Option<PersistentTrack>> {
        let doc_id = vtrack_models::track_key(video_id, track_id);
        match self.client.get_document(TRACKS_COLLECTION, &doc_id).await? {
            Some(doc) => Ok(Some(document_to_track(&doc)?)),
            None => Ok(None),
        }
    }
}

fn track_to_fields(track: &PersistentTrack) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("video_id".to_string(), track.video_id.to_value());
    fields.insert("track_id".to_string(), track.track_id.to_value());
    fields.insert("start_time".to_string(), track.start_time.as_str().to_value());
    fields.insert("end_time".to_string(), track.end_time.as_str().to_value());

    let frames: Vec<Value> = track.frames.iter().map(observation_to_value).collect();
    fields.insert("frames".to_string(), Value::ArrayValue(ArrayValue { values: Some(frames) }));
    fields
}

fn observation_to_value(obs: &FrameObservation) -> Value {
    let mut f = HashMap::new();
    f.insert("frame".to_string(), obs.frame_index.to_value());
    f.insert("timestamp".to_string(), obs.timestamp.as_str().to_value());
    f.insert("box".to_string(), obs.bbox.to_array().to_vec().to_value());
    f.insert("confidence".to_string(), obs.confidence.to_value());
    f.insert("interpolated".to_string(), obs.interpolated.to_value());
    f.insert("jitter_corrected".to_string(), obs.jitter_corrected.to_value());
    if let Some(pos) = obs.relative_position {
        f.insert("relative_position".to_string(), relative_position_label(pos).to_value());
    }
    Value::MapValue(MapValue { fields: Some(f) })
}

fn document_to_track(doc: &Document) -> StoreResult<PersistentTrack> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| StoreError::invalid_document("document has no fields"))?;

    let video_id = fields
        .get("video_id")
        .and_then(String::from_value)
        .ok_or_else(|| StoreError::invalid_document("missing video_id"))?;
    let track_id = fields
        .get("track_id")
        .and_then(u32::from_value)
        .ok_or_else(|| StoreError::invalid_document("missing track_id"))?;
    let start_time = fields
        .get("start_time")
        .and_then(String::from_value)
        .ok_or_else(|| StoreError::invalid_document("missing start_time"))?;
    let end_time = fields
        .get("end_time")
        .and_then(String::from_value)
        .ok_or_else(|| StoreError::invalid_document("missing end_time"))?;

    let frames = fields
        .get("frames")
        .and_then(|v| match v {
            Value::ArrayValue(ArrayValue { values: Some(values) }) => Some(values),
            _ => None,
        })
        .ok_or_else(|| StoreError::invalid_document("missing frames array"))?
        .iter()
        .filter_map(value_to_observation)
        .collect::<Vec<_>>();

    if frames.is_empty() {
        return Err(StoreError::invalid_document("track has no frames"));
    }

    let id = vtrack_models::track_key(&video_id, track_id);
    Ok(PersistentTrack {
        id,
        video_id,
        track_id,
        start_time: Timestamp::from_seconds(
            vtrack_models::ts_to_seconds(&start_time).unwrap_or(0.0),
        ),
        end_time: Timestamp::from_seconds(vtrack_models::ts_to_seconds(&end_time).unwrap_or(0.0)),
        frames,
    })
}

fn value_to_observation(v: &Value) -> Option<FrameObservation> {
    let Value::MapValue(MapValue { fields: Some(f) }) = v else {
        return None;
    };
    let frame_index = f.get("frame").and_then(u64::from_value)?;
    let timestamp_str = f.get("timestamp").and_then(String::from_value)?;
    let box_values = match f.get("box") {
        Some(Value::ArrayValue(ArrayValue { values: Some(vals) })) => vals,
        _ => return None,
    };
    if box_values.len() != 4 {
        return None;
    }
    let mut arr = [0.0f64; 4];
    for (i, val) in box_values.iter().enumerate() {
        arr[i] = f64::from_value(val)?;
    }
    let bbox = BBox::from_array(arr);
    let confidence = f.get("confidence").and_then(f32::from_value);
    let interpolated = f.get("interpolated").and_then(bool::from_value).unwrap_or(false);
    let jitter_corrected = f.get("jitter_corrected").and_then(bool::from_value).unwrap_or(false);
    let relative_position = f
        .get("relative_position")
        .and_then(String::from_value)
        .and_then(|s| parse_relative_position(&s));

    Some(FrameObservation {
        frame_index,
        timestamp: Timestamp::from_seconds(vtrack_models::ts_to_seconds(&timestamp_str).unwrap_or(0.0)),
        bbox,
        confidence,
        interpolated,
        jitter_corrected,
        relative_position,
    })
}

fn relative_position_label(pos: RelativePosition) -> &'static str {
    use RelativePosition::*;
    match pos {
        TopLeft => "top-left",
        TopCenter => "top-center",
        TopRight => "top-right",
        MiddleLeft => "middle-left",
        Center => "center",
        MiddleRight => "middle-right",
        BottomLeft => "bottom-left",
        BottomCenter => "bottom-center",
        BottomRight => "bottom-right",
    }
}

fn parse_relative_position(s: &str) -> Option<RelativePosition> {
    use RelativePosition::*;
    Some(match s {
        "top-left" => TopLeft,
        "top-center" => TopCenter,
        "top-right" => TopRight,
        "middle-left" => MiddleLeft,
        "center" => Center,
        "middle-right" => MiddleRight,
        "bottom-left" => BottomLeft,
        "bottom-center" => BottomCenter,
        "bottom-right" => BottomRight,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtrack_models::Timestamp;

    fn sample_track() -> PersistentTrack {
        let obs = FrameObservation::detected(
            0,
            Timestamp::from_seconds(0.0),
            BBox::new(1.0, 2.0, 3.0, 4.0),
            0.9,
        )
        .with_relative_position(Some(RelativePosition::Center));
        PersistentTrack::new("video_1", 7, obs)
    }

    #[test]
    fn round_trips_through_fields() {
        let track = sample_track();
        let fields = track_to_fields(&track);
        let doc = Document::new(fields);
        let back = document_to_track(&doc).unwrap();
        assert_eq!(back.video_id, track.video_id);
        assert_eq!(back.track_id, track.track_id);
        assert_eq!(back.frames.len(), 1);
        assert_eq!(back.frames[0].bbox, track.frames[0].bbox);
        assert_eq!(back.frames[0].relative_position, Some(RelativePosition::Center));
    }

    #[test]
    fn relative_position_label_round_trips() {
        for pos in [
            RelativePosition::TopLeft,
            RelativePosition::TopCenter,
            RelativePosition::TopRight,
            RelativePosition::MiddleLeft,
            RelativePosition::Center,
            RelativePosition::MiddleRight,
            RelativePosition::BottomLeft,
            RelativePosition::BottomCenter,
            RelativePosition::BottomRight,
        ] {
            let label = relative_position_label(pos);
            assert_eq!(parse_relative_position(label), Some(pos));
        }
    }
}
