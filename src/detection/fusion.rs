// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Feature fusion and the linear classification head

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::Array4;
use std::sync::Arc;
use tracing::debug;

use super::checkpoint::CheckpointError;
use super::verdict::ImageVerdict;
use crate::vision::clip::CLIP_FEATURE_DIM;
use crate::vision::freqnet::FREQNET_FEATURE_DIM;
use crate::vision::preprocessing::normalize_pair;
use crate::vision::FeatureExtractor;

/// FreqNet feature length
pub const FREQNET_DIM: usize = FREQNET_FEATURE_DIM;

/// CLIP image embedding length
pub const CLIP_DIM: usize = CLIP_FEATURE_DIM;

/// Length of the fused vector fed to the head
pub const FUSED_DIM: usize = FREQNET_DIM + CLIP_DIM;

/// Lower bound on the norm used by [`l2_normalize`]
const NORM_EPSILON: f32 = 1e-12;

/// Logistic sigmoid
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Scale `v` to unit L2 norm
///
/// Near-zero vectors are divided by `1e-12` instead of their norm, so a zero
/// vector stays zero.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(NORM_EPSILON);
    v.iter().map(|x| x / norm).collect()
}

/// Normalise both vectors and concatenate them, FreqNet first
pub fn fuse(freq: &[f32], clip: &[f32]) -> Vec<f32> {
    let mut fused = l2_normalize(freq);
    fused.extend(l2_normalize(clip));
    fused
}

/// Learned `FUSED_DIM -> 1` linear layer
#[derive(Debug, Clone, PartialEq)]
pub struct FusionHead {
    weight: Vec<f32>,
    bias: f32,
}

impl FusionHead {
    pub fn new(weight: Vec<f32>, bias: f32) -> Result<Self, CheckpointError> {
        if weight.len() != FUSED_DIM {
            return Err(CheckpointError::ShapeMismatch {
                name: "fc.weight".to_string(),
                expected: vec![1, FUSED_DIM],
                actual: vec![1, weight.len()],
            });
        }
        if !bias.is_finite() || weight.iter().any(|w| !w.is_finite()) {
            return Err(CheckpointError::NonFinite("fc".to_string()));
        }
        Ok(Self { weight, bias })
    }

    pub fn weight(&self) -> &[f32] {
        &self.weight
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// `w · fused + b`
    pub fn logit(&self, fused: &[f32]) -> Result<f32> {
        if fused.len() != self.weight.len() {
            anyhow::bail!(
                "Fused vector has {} values, head expects {}",
                fused.len(),
                self.weight.len()
            );
        }
        let dot: f32 = self.weight.iter().zip(fused).map(|(w, x)| w * x).sum();
        Ok(dot + self.bias)
    }
}

/// FreqNet + CLIP extractors with the fusion head
///
/// Immutable after construction; shared across requests behind an `Arc`.
pub struct HybridDetector {
    freqnet: Arc<dyn FeatureExtractor>,
    clip: Arc<dyn FeatureExtractor>,
    head: FusionHead,
}

impl std::fmt::Debug for HybridDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridDetector")
            .field("freqnet", &self.freqnet.name())
            .field("clip", &self.clip.name())
            .field("bias", &self.head.bias)
            .finish()
    }
}

impl HybridDetector {
    /// Combine two extractors with a head
    ///
    /// # Errors
    /// Returns error if the extractor dimensions are not 512 (FreqNet) and 768 (CLIP).
    pub fn new(
        freqnet: Arc<dyn FeatureExtractor>,
        clip: Arc<dyn FeatureExtractor>,
        head: FusionHead,
    ) -> Result<Self> {
        if freqnet.dimension() != FREQNET_DIM {
            anyhow::bail!(
                "FreqNet extractor '{}' has dimension {}, expected {}",
                freqnet.name(),
                freqnet.dimension(),
                FREQNET_DIM
            );
        }
        if clip.dimension() != CLIP_DIM {
            anyhow::bail!(
                "CLIP extractor '{}' has dimension {}, expected {}",
                clip.name(),
                clip.dimension(),
                CLIP_DIM
            );
        }
        Ok(Self {
            freqnet,
            clip,
            head,
        })
    }

    pub fn head(&self) -> &FusionHead {
        &self.head
    }

    pub fn extractor_names(&self) -> (&str, &str) {
        (self.freqnet.name(), self.clip.name())
    }

    /// Extract, fuse and score one image; returns the pre-sigmoid logit
    pub fn classify(&self, freq_tensor: &Array4<f32>, clip_tensor: &Array4<f32>) -> Result<f32> {
        let freq = self
            .freqnet
            .extract(freq_tensor)
            .context("FreqNet feature extraction failed")?;
        let clip = self
            .clip
            .extract(clip_tensor)
            .context("CLIP feature extraction failed")?;

        if freq.len() != FREQNET_DIM || clip.len() != CLIP_DIM {
            anyhow::bail!(
                "Extractors returned {} + {} features, expected {} + {}",
                freq.len(),
                clip.len(),
                FREQNET_DIM,
                CLIP_DIM
            );
        }

        self.head.logit(&fuse(&freq, &clip))
    }

    /// Probability in (0, 1) that the image is real
    pub fn real_probability(&self, image: &DynamicImage) -> Result<f32> {
        let pair = normalize_pair(image);
        let logit = self.classify(&pair.freqnet, &pair.clip)?;
        let probability = sigmoid(logit);
        debug!("Image logit {:.4} -> p(real) {:.4}", logit, probability);
        Ok(probability)
    }

    /// Full single-image pipeline: normalise, classify and label
    pub fn analyze_image(&self, image: &DynamicImage, threshold: f32) -> Result<ImageVerdict> {
        let probability = self.real_probability(image)?;
        Ok(ImageVerdict::from_probability(probability, threshold))
    }
}
