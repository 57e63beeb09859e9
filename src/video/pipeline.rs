// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end video analysis

use anyhow::{Context, Result};
use image::DynamicImage;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::sampler::extract_face_crops;
use super::source::{FfmpegFrameSource, FrameSource};
use super::voting::{aggregate, VideoVerdict, VotingPolicy};
use crate::config::DetectorConfig;
use crate::vision::face::FaceDetector;
use crate::vision::preprocessing::to_freqnet_tensor;
use crate::vision::FrameClassifier;

/// Result of analysing one video
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysis {
    pub verdict: VideoVerdict,
    pub message: String,
    pub real_count: usize,
    pub fake_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_probability: Option<f32>,
    pub crops_analyzed: usize,
    pub frames_sampled: usize,
    /// Per-crop "real" probabilities in crop order
    #[serde(skip)]
    pub probabilities: Vec<f32>,
}

/// Face detector + frame classifier + policy
#[derive(Clone)]
pub struct VideoPipeline {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn FrameClassifier>,
    config: DetectorConfig,
}

impl std::fmt::Debug for VideoPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoPipeline")
            .field("classifier", &self.classifier.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VideoPipeline {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        classifier: Arc<dyn FrameClassifier>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            detector,
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Open a video file with ffmpeg and analyse it
    ///
    /// Container and decode failures surface as a [`super::VideoError`]
    /// inside the returned `anyhow::Error`.
    pub fn analyze_path<P: AsRef<Path>>(&self, path: P) -> Result<VideoAnalysis> {
        let path = path.as_ref();
        let mut source = FfmpegFrameSource::open(path)?;
        info!(
            "Analysing video {} ({} frames)",
            path.display(),
            source.frame_count()
        );
        self.analyze_source(&mut source)
    }

    /// Analyse frames from any source
    ///
    /// Frames that fail to decode are skipped. A crop the classifier cannot
    /// score fails the whole call.
    pub fn analyze_source(&self, source: &mut dyn FrameSource) -> Result<VideoAnalysis> {
        let crop_set = extract_face_crops(
            source,
            self.detector.as_ref(),
            self.config.sample_count,
            self.config.box_scaling,
        )?;

        let mut probabilities = Vec::with_capacity(crop_set.crops.len());
        for crop in &crop_set.crops {
            let tensor = to_freqnet_tensor(&DynamicImage::ImageRgb8(crop.image.clone()));
            let probability = self
                .classifier
                .real_probability(&tensor)
                .with_context(|| {
                    format!(
                        "Failed to classify face {} on frame {}",
                        crop.face_index, crop.frame_index
                    )
                })?;
            debug!(
                "Frame {} face {}: p(real) = {:.4}",
                crop.frame_index, crop.face_index, probability
            );
            probabilities.push(probability);
        }

        let tally = aggregate(&probabilities, &VotingPolicy::from(&self.config));
        info!(
            "Video verdict: {} (real: {}, fake: {}, mean: {:?})",
            tally.verdict, tally.real_count, tally.fake_count, tally.mean_probability
        );

        Ok(VideoAnalysis {
            verdict: tally.verdict,
            message: tally.verdict.message().to_string(),
            real_count: tally.real_count,
            fake_count: tally.fake_count,
            mean_probability: tally.mean_probability,
            crops_analyzed: probabilities.len(),
            frames_sampled: crop_set.frames_sampled,
            probabilities,
        })
    }
}
