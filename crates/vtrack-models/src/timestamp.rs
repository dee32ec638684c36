//! `HH:MM:SS.mmm` timestamp formatting shared by the tracking core and the store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A timestamp rendered as `HH:MM:SS.mmm`, 24-hour.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Build a timestamp from a seconds offset.
    pub fn from_seconds(total_secs: f64) -> Self {
        Self(seconds_to_ts(total_secs))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to seconds as a float: `hh*3600 + mm*60 + ss.mmm`.
    pub fn as_seconds(&self) -> f64 {
        ts_to_seconds(&self.0).unwrap_or(0.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for Timestamp {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Format a seconds offset as `HH:MM:SS.mmm`.
pub fn seconds_to_ts(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let total_ms = (total_secs * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let secs = total_s % 60;
    let mins = (total_s / 60) % 60;
    let hours = total_s / 3600;
    format!("{hours:02}:{mins:02}:{secs:02}.{ms:03}")
}

/// Parse `HH:MM:SS.mmm` into total seconds.
pub fn ts_to_seconds(ts: &str) -> Option<f64> {
    let (hms, ms) = ts.split_once('.')?;
    let ms: f64 = ms.parse().ok()?;
    let digits = ts.split_once('.').map(|(_, m)| m.len()).unwrap_or(3);
    let ms_scale = 10f64.powi(3 - digits as i32);
    let mut parts = hms.split(':');
    let hh: f64 = parts.next()?.parse().ok()?;
    let mm: f64 = parts.next()?.parse().ok()?;
    let ss: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hh * 3600.0 + mm * 60.0 + ss + (ms * ms_scale) / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for secs in [0.0, 0.5, 1.234, 59.999, 61.0, 3661.5, 86399.999] {
            let ts = seconds_to_ts(secs);
            let back = ts_to_seconds(&ts).unwrap();
            assert!((back - secs).abs() < 0.001, "secs={secs} ts={ts} back={back}");
        }
    }

    #[test]
    fn format_matches_pattern() {
        assert_eq!(seconds_to_ts(0.0), "00:00:00.000");
        assert_eq!(seconds_to_ts(3661.5), "01:01:01.500");
    }

    #[test]
    fn parse_well_formed() {
        assert_eq!(ts_to_seconds("00:00:00.000"), Some(0.0));
        assert!((ts_to_seconds("01:01:01.500").unwrap() - 3661.5).abs() < 1e-9);
    }

    #[test]
    fn timestamp_round_trip_via_wrapper() {
        let ts = Timestamp::from_seconds(125.25);
        assert_eq!(ts.as_str(), "00:02:05.250");
        assert!((ts.as_seconds() - 125.25).abs() < 0.001);
    }
}
