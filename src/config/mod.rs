// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration for the detector service
//!
//! Configuration is layered:
//! 1. Built-in defaults (the values the models were calibrated with)
//! 2. Optional TOML file (`AppConfig::from_file`)
//! 3. Environment variable overrides (`AppConfig::apply_env`)
//!
//! Every policy constant used by the image and video pipelines lives in
//! [`DetectorConfig`] so the voting and tie-breaking rules can be audited
//! and tested in one place.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Probability at or below which a crop/image is called fake
pub const DEFAULT_DECISION_THRESHOLD: f32 = 0.5;

/// Mean probability a tied vote must exceed to be called real.
/// Deliberately above 0.5 so ties lean towards "fake". Kept in `f64`: the
/// `f32` mean is widened before the comparison.
pub const DEFAULT_TIE_BREAK_THRESHOLD: f64 = 0.549;

/// Absolute number of "real" crops needed for a real verdict when the vote is not tied
pub const DEFAULT_MIN_REAL_VOTES: usize = 3;

/// Number of frames sampled from each video
pub const DEFAULT_SAMPLE_COUNT: usize = 10;

/// Factor by which detected face boxes are grown around their own centre
pub const DEFAULT_BOX_SCALING: f32 = 2.0;

/// Minimum face detector score
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.5;

/// Default listen address (the browser extension posts to this port)
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";

/// Only browser-extension origins may call the API by default
pub const DEFAULT_CORS_ORIGIN_PREFIX: &str = "chrome-extension://";

/// Maximum request body (video uploads included)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Detection policy shared by the image and video pipelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// `probability <= decision_threshold` means deepfake
    pub decision_threshold: f32,
    /// Mean probability needed to call a tied vote real
    pub tie_break_threshold: f64,
    /// Real crops needed for a real verdict on an untied vote
    pub min_real_votes: usize,
    /// Frames sampled per video
    pub sample_count: usize,
    /// Face box expansion factor
    pub box_scaling: f32,
    /// Face detector score cut-off
    pub min_detection_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            tie_break_threshold: DEFAULT_TIE_BREAK_THRESHOLD,
            min_real_votes: DEFAULT_MIN_REAL_VOTES,
            sample_count: DEFAULT_SAMPLE_COUNT,
            box_scaling: DEFAULT_BOX_SCALING,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
        }
    }
}

impl DetectorConfig {
    /// Validate policy values
    pub fn validate(&self) -> Result<()> {
        let unit_interval = [
            ("decision_threshold", f64::from(self.decision_threshold)),
            ("tie_break_threshold", self.tie_break_threshold),
            ("min_detection_confidence", f64::from(self.min_detection_confidence)),
        ];
        for (name, value) in unit_interval {
            if !(value > 0.0 && value < 1.0) {
                return Err(anyhow!("{} must be in (0, 1), got {}", name, value));
            }
        }

        if self.sample_count == 0 {
            return Err(anyhow!("sample_count must be greater than 0"));
        }

        if !(self.box_scaling.is_finite() && self.box_scaling > 0.0) {
            return Err(anyhow!(
                "box_scaling must be a positive number, got {}",
                self.box_scaling
            ));
        }

        Ok(())
    }
}

/// Locations of the model artefacts
///
/// Every entry is optional: a missing model disables the pipeline that needs it
/// instead of aborting startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    /// FreqNet feature extractor (512-d output)
    pub freqnet: Option<PathBuf>,
    /// CLIP image encoder (768-d output)
    pub clip: Option<PathBuf>,
    /// Fusion head checkpoint (JSON state dict)
    pub fusion_checkpoint: Option<PathBuf>,
    /// Stand-alone FreqNet classifier used per video frame
    pub frame_classifier: Option<PathBuf>,
    /// Face detector used by the video pipeline
    pub face_detector: Option<PathBuf>,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            freqnet: Some(PathBuf::from("./models/freqnet/freqnet_features.onnx")),
            clip: Some(PathBuf::from("./models/clip-vit-large-patch14/vision_model.onnx")),
            fusion_checkpoint: Some(PathBuf::from("./models/fusion/checkpoint.json")),
            frame_classifier: Some(PathBuf::from("./models/freqnet/freqnet_classifier.onnx")),
            face_detector: Some(PathBuf::from("./models/face/version-RFB-320.onnx")),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Origins must start with this prefix to pass CORS
    pub cors_origin_prefix: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            cors_origin_prefix: DEFAULT_CORS_ORIGIN_PREFIX.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub models: ModelPaths,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// Sections (`[detector]`, `[models]`, `[server]`) and keys are all optional.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Defaults, then the optional file, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("DETECTOR_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(prefix) = lookup("DETECTOR_CORS_ORIGIN_PREFIX") {
            self.server.cors_origin_prefix = prefix;
        }
        override_parsed(&lookup, "DETECTOR_MAX_UPLOAD_BYTES", &mut self.server.max_upload_bytes);

        override_path(&lookup, "FREQNET_MODEL_PATH", &mut self.models.freqnet);
        override_path(&lookup, "CLIP_MODEL_PATH", &mut self.models.clip);
        override_path(&lookup, "FUSION_CHECKPOINT_PATH", &mut self.models.fusion_checkpoint);
        override_path(&lookup, "FRAME_CLASSIFIER_MODEL_PATH", &mut self.models.frame_classifier);
        override_path(&lookup, "FACE_DETECTOR_MODEL_PATH", &mut self.models.face_detector);

        override_parsed(&lookup, "DECISION_THRESHOLD", &mut self.detector.decision_threshold);
        override_parsed(&lookup, "TIE_BREAK_THRESHOLD", &mut self.detector.tie_break_threshold);
        override_parsed(&lookup, "MIN_REAL_VOTES", &mut self.detector.min_real_votes);
        override_parsed(&lookup, "FRAME_SAMPLE_COUNT", &mut self.detector.sample_count);
        override_parsed(&lookup, "BOX_SCALING", &mut self.detector.box_scaling);
        override_parsed(
            &lookup,
            "MIN_DETECTION_CONFIDENCE",
            &mut self.detector.min_detection_confidence,
        );
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;

        if self.server.listen_addr.trim().is_empty() {
            return Err(anyhow!("listen_addr must not be empty"));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than 0"));
        }

        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => {
                debug!("Config override from {}", key);
                *target = value;
            }
            Err(_) => warn!("Ignoring unparseable value for {}: {:?}", key, raw),
        }
    }
}

/// An empty value disables the model
fn override_path<F>(lookup: &F, key: &str, target: &mut Option<PathBuf>)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = if raw.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(raw))
        };
    }
}
