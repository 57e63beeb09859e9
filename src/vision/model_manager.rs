// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector model manager
//!
//! Loads every model once at startup into an immutable handle that is shared
//! by all requests. Missing or broken models leave their slot empty; the
//! endpoints that need them then report the service as unavailable.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::clip::OnnxClipImageEncoder;
use super::extractor::{FeatureExtractor, FrameClassifier};
use super::face::{FaceDetector, OnnxFaceDetector};
use super::freqnet::{OnnxFreqNet, OnnxFreqNetClassifier};
use crate::config::{DetectorConfig, ModelPaths};
use crate::detection::{FusionCheckpoint, HybridDetector};
use crate::video::VideoPipeline;

/// Availability of one model slot
#[derive(Debug, Clone, Serialize)]
pub struct DetectorModelInfo {
    pub name: String,
    /// Model type (image, video-frame, face-detection)
    pub model_type: String,
    pub available: bool,
}

/// Provenance of the loaded fusion head
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    pub sha256: String,
}

/// Shared handle to all loaded models
pub struct DetectorModelManager {
    hybrid: Option<Arc<HybridDetector>>,
    frame_classifier: Option<Arc<dyn FrameClassifier>>,
    face_detector: Option<Arc<dyn FaceDetector>>,
    checkpoint: Option<CheckpointInfo>,
    config: DetectorConfig,
}

impl std::fmt::Debug for DetectorModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorModelManager")
            .field("hybrid", &self.hybrid.is_some())
            .field("frame_classifier", &self.frame_classifier.is_some())
            .field("face_detector", &self.face_detector.is_some())
            .field("checkpoint", &self.checkpoint)
            .finish()
    }
}

impl DetectorModelManager {
    /// Load all configured models
    ///
    /// Failures are logged and leave the slot empty; this only errors if the
    /// configuration itself is invalid.
    pub async fn new(paths: &ModelPaths, config: DetectorConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let (hybrid, checkpoint) = match load_hybrid(paths) {
            Ok((detector, info)) => {
                tracing::info!("✅ Hybrid FreqNet + CLIP detector loaded");
                (Some(Arc::new(detector)), Some(info))
            }
            Err(e) => {
                tracing::warn!("⚠️ Image detector unavailable: {:#}", e);
                (None, None)
            }
        };

        let frame_classifier: Option<Arc<dyn FrameClassifier>> =
            match optional_path(&paths.frame_classifier, "frame classifier")
                .and_then(|p| OnnxFreqNetClassifier::load(p))
            {
                Ok(model) => {
                    tracing::info!("✅ FreqNet frame classifier loaded");
                    Some(Arc::new(model))
                }
                Err(e) => {
                    tracing::warn!("⚠️ Frame classifier unavailable: {:#}", e);
                    None
                }
            };

        let face_detector: Option<Arc<dyn FaceDetector>> =
            match optional_path(&paths.face_detector, "face detector")
                .and_then(|p| OnnxFaceDetector::load(p, config.min_detection_confidence))
            {
                Ok(model) => {
                    tracing::info!("✅ Face detector loaded");
                    Some(Arc::new(model))
                }
                Err(e) => {
                    tracing::warn!("⚠️ Face detector unavailable: {:#}", e);
                    None
                }
            };

        Ok(Self {
            hybrid,
            frame_classifier,
            face_detector,
            checkpoint,
            config,
        })
    }

    /// Build a manager from already constructed components
    pub fn from_parts(
        hybrid: Option<Arc<HybridDetector>>,
        frame_classifier: Option<Arc<dyn FrameClassifier>>,
        face_detector: Option<Arc<dyn FaceDetector>>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            hybrid,
            frame_classifier,
            face_detector,
            checkpoint: None,
            config,
        }
    }

    pub fn with_checkpoint_info(mut self, info: CheckpointInfo) -> Self {
        self.checkpoint = Some(info);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Get the single-image detector if available
    pub fn get_hybrid_detector(&self) -> Option<Arc<HybridDetector>> {
        self.hybrid.clone()
    }

    pub fn get_frame_classifier(&self) -> Option<Arc<dyn FrameClassifier>> {
        self.frame_classifier.clone()
    }

    pub fn get_face_detector(&self) -> Option<Arc<dyn FaceDetector>> {
        self.face_detector.clone()
    }

    pub fn checkpoint_info(&self) -> Option<&CheckpointInfo> {
        self.checkpoint.as_ref()
    }

    /// Video pipeline, if both the face detector and frame classifier loaded
    pub fn video_pipeline(&self) -> Option<VideoPipeline> {
        match (&self.face_detector, &self.frame_classifier) {
            (Some(detector), Some(classifier)) => Some(VideoPipeline::new(
                detector.clone(),
                classifier.clone(),
                self.config.clone(),
            )),
            _ => None,
        }
    }

    pub fn has_image_detector(&self) -> bool {
        self.hybrid.is_some()
    }

    pub fn has_video_pipeline(&self) -> bool {
        self.face_detector.is_some() && self.frame_classifier.is_some()
    }

    /// List all model slots and their availability
    pub fn list_models(&self) -> Vec<DetectorModelInfo> {
        vec![
            DetectorModelInfo {
                name: "freqnet-clip-fusion".to_string(),
                model_type: "image".to_string(),
                available: self.hybrid.is_some(),
            },
            DetectorModelInfo {
                name: self
                    .frame_classifier
                    .as_ref()
                    .map(|m| m.name().to_string())
                    .unwrap_or_else(|| "freqnet-classifier".to_string()),
                model_type: "video-frame".to_string(),
                available: self.frame_classifier.is_some(),
            },
            DetectorModelInfo {
                name: "ultraface-rfb-320".to_string(),
                model_type: "face-detection".to_string(),
                available: self.face_detector.is_some(),
            },
        ]
    }
}

fn optional_path<'a>(path: &'a Option<std::path::PathBuf>, label: &str) -> anyhow::Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| anyhow::anyhow!("no {} model configured", label))
}

/// FreqNet + CLIP + fusion checkpoint, all or nothing
fn load_hybrid(paths: &ModelPaths) -> anyhow::Result<(HybridDetector, CheckpointInfo)> {
    let freqnet_path = optional_path(&paths.freqnet, "FreqNet")?;
    let clip_path = optional_path(&paths.clip, "CLIP")?;
    let checkpoint_path = optional_path(&paths.fusion_checkpoint, "fusion checkpoint")?;

    let checkpoint = FusionCheckpoint::load(checkpoint_path)?;
    let freqnet: Arc<dyn FeatureExtractor> = Arc::new(OnnxFreqNet::load(freqnet_path)?);
    let clip: Arc<dyn FeatureExtractor> = Arc::new(OnnxClipImageEncoder::load(clip_path)?);

    let info = CheckpointInfo {
        path: Some(checkpoint_path.display().to_string()),
        epoch: checkpoint.epoch,
        sha256: checkpoint.sha256.clone(),
    };
    let detector = HybridDetector::new(freqnet, clip, checkpoint.head)?;
    Ok((detector, info))
}
