//! HTTP client for the external object detector (§6 "Detector"): a single
//! `infer` call, no state retained across calls, mirroring the detached
//! inference-process model the host codebase uses for its other ML service
//! calls (the Gemini/ML-client HTTP pattern).

use std::time::Duration;

use async_trait::async_trait;
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use serde::Deserialize;

use vtrack_models::{BBox, Detection};

use crate::collaborators::Detector;

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub endpoint_url: String,
    pub timeout: Duration,
}

impl DetectorConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var("DETECTOR_ENDPOINT_URL")
                .unwrap_or_else(|_| "http://localhost:8501/infer".to_string()),
            timeout: Duration::from_secs(
                std::env::var("DETECTOR_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Wire shape returned by the inference service: one entry per detection.
#[derive(Debug, Deserialize)]
struct WireDetection {
    box_xyxy: [f64; 4],
    confidence: f32,
    #[serde(default)]
    class_label: Option<String>,
}

/// Detector implementation that POSTs a JPEG-encoded frame to an external
/// inference service and parses its JSON detection list. No state is kept
/// between calls (§6).
pub struct HttpDetector {
    http: reqwest::Client,
    endpoint_url: String,
}

impl HttpDetector {
    pub fn new(config: DetectorConfig) -> crate::error::EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| crate::error::EngineError::detector(e.to_string()))?;
        Ok(Self { http, endpoint_url: config.endpoint_url })
    }

    pub fn from_env() -> crate::error::EngineResult<Self> {
        Self::new(DetectorConfig::from_env())
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn infer(&self, color_frame: &Mat) -> anyhow::Result<Vec<Detection>> {
        let mut buf = Vector::<u8>::new();
        imgcodecs::imencode(".jpg", color_frame, &mut buf, &Vector::new())?;

        let resp = self
            .http
            .post(&self.endpoint_url)
            .header("content-type", "image/jpeg")
            .body(buf.to_vec())
            .send()
            .await?
            .error_for_status()?;

        let wire: Vec<WireDetection> = resp.json().await?;
        Ok(wire
            .into_iter()
            .map(|w| {
                let bbox = BBox::from_array(w.box_xyxy);
                let mut det = Detection::new(bbox, w.confidence);
                det.class_label = w.class_label;
                det
            })
            .collect())
    }
}

/// Fixed-response detector used by tests and local runs without a live
/// inference service (§10.4).
pub struct StubDetector {
    pub detections: Vec<Detection>,
}

impl StubDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn empty() -> Self {
        Self { detections: Vec::new() }
    }
}

#[async_trait]
impl Detector for StubDetector {
    async fn infer(&self, _color_frame: &Mat) -> anyhow::Result<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_detector_returns_fixed_detections() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let detector = StubDetector::new(vec![Detection::new(bbox, 0.9)]);
        let frame = Mat::default();
        let result = detector.infer(&frame).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].bbox, bbox);
    }

    #[test]
    fn config_defaults_to_local_endpoint() {
        std::env::remove_var("DETECTOR_ENDPOINT_URL");
        std::env::remove_var("DETECTOR_TIMEOUT_SECONDS");
        let config = DetectorConfig::from_env();
        assert_eq!(config.endpoint_url, "http://localhost:8501/infer");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
