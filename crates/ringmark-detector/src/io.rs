//! JSON configuration and report helpers for sequence detection.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{FrameStats, MarkerDetection, RingDetector, RingDetectorParams, TrackingPhase};

#[derive(thiserror::Error, Debug)]
pub enum RingIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration for running the detector over an image sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingDetectConfig {
    /// Frames in capture order; all must share one size.
    pub images: Vec<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    /// Directory for overlay PNGs; overlays are written only when set.
    #[serde(default)]
    pub overlay_dir: Option<String>,
    #[serde(default)]
    pub detector: RingDetectorParams,
}

impl RingDetectConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RingIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RingIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("ringmark_report.json"))
    }

    /// Detector parameters with overlay drawing switched on when an overlay
    /// directory is configured.
    pub fn build_params(&self) -> RingDetectorParams {
        let mut params = self.detector.clone();
        if self.overlay_dir.is_some() {
            params.debug.draw = true;
        }
        params
    }
}

/// Outcome of one frame of the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameReport {
    pub image_path: String,
    pub detection: MarkerDetection,
    pub phase: TrackingPhase,
    /// Threshold that will be used for the next frame.
    pub next_threshold: u32,
    pub stats: FrameStats,
    #[serde(default)]
    pub overlay_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FrameReport {
    /// Snapshot the detector right after it processed `image_path`.
    pub fn from_detector(image_path: &str, detector: &RingDetector) -> Self {
        Self {
            image_path: image_path.to_string(),
            detection: *detector.last_detection(),
            phase: detector.phase(),
            next_threshold: detector.threshold(),
            stats: *detector.last_stats(),
            overlay_path: None,
            error: None,
        }
    }

    /// Report for a frame that could not be processed.
    pub fn failed(image_path: &str, error: impl std::fmt::Display) -> Self {
        Self {
            image_path: image_path.to_string(),
            detection: MarkerDetection::invalid(),
            phase: TrackingPhase::Lost,
            next_threshold: 0,
            stats: FrameStats::default(),
            overlay_path: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingDetectReport {
    pub config_path: String,
    pub width: usize,
    pub height: usize,
    pub params: RingDetectorParams,
    pub frames: Vec<FrameReport>,
    /// Frames with a valid detection.
    pub detected: usize,
}

impl RingDetectReport {
    pub fn new(config_path: &Path, width: usize, height: usize, params: RingDetectorParams) -> Self {
        Self {
            config_path: config_path.to_string_lossy().into_owned(),
            width,
            height,
            params,
            frames: Vec::new(),
            detected: 0,
        }
    }

    pub fn push(&mut self, frame: FrameReport) {
        if frame.detection.valid {
            self.detected += 1;
        }
        self.frames.push(frame);
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RingIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RingIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RingPolarity;

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let cfg: RingDetectConfig = serde_json::from_str(
            r#"{
                "images": ["a.png", "b.png"],
                "overlay_dir": "out",
                "detector": { "polarity": "light_ring", "max_failed": 3 }
            }"#,
        )
        .expect("parse config");
        cfg.write_json(&path).expect("write");

        let loaded = RingDetectConfig::load_json(&path).expect("load");
        assert_eq!(loaded.images, vec!["a.png", "b.png"]);
        assert_eq!(loaded.detector.polarity, RingPolarity::LightRing);
        assert_eq!(loaded.detector.max_failed, 3);
        assert_eq!(loaded.output_path(), PathBuf::from("ringmark_report.json"));
        assert!(loaded.build_params().debug.draw);
    }

    #[test]
    fn report_counts_valid_frames() {
        let mut report =
            RingDetectReport::new(Path::new("cfg.json"), 64, 48, RingDetectorParams::default());
        report.push(FrameReport::failed("a.png", "unreadable"));
        let mut ok = FrameReport::failed("b.png", "");
        ok.detection.valid = true;
        ok.error = None;
        report.push(ok);
        assert_eq!(report.detected, 1);
        assert_eq!(report.frames[0].error.as_deref(), Some("unreadable"));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");
        report.write_json(&path).expect("write");
        let loaded = RingDetectReport::load_json(&path).expect("load");
        assert_eq!(loaded.frames.len(), 2);
        assert_eq!(loaded.detected, 1);
    }
}
