// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! FreqNet backbones
//!
//! Two exports of the same frequency-domain network are used:
//! - the feature extractor (classification head removed, 512 outputs) feeds
//!   the image fusion classifier
//! - the full classifier (one logit) scores face crops sampled from videos

use anyhow::Result;
use ndarray::Array4;
use std::path::Path;
use tracing::debug;

use super::extractor::{FeatureExtractor, FrameClassifier};
use super::onnx::OnnxSession;

/// Length of the FreqNet feature vector
pub const FREQNET_FEATURE_DIM: usize = 512;

/// FreqNet feature extractor backed by ONNX Runtime
#[derive(Debug)]
pub struct OnnxFreqNet {
    session: OnnxSession,
}

impl OnnxFreqNet {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = OnnxSession::load(model_path, "FreqNet")?;
        Ok(Self { session })
    }
}

impl FeatureExtractor for OnnxFreqNet {
    fn name(&self) -> &str {
        "freqnet"
    }

    fn dimension(&self) -> usize {
        FREQNET_FEATURE_DIM
    }

    fn extract(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let mut outputs = self.session.run(input, &[0])?;
        let features = outputs.pop().unwrap_or_default();

        if features.len() != FREQNET_FEATURE_DIM {
            anyhow::bail!(
                "FreqNet returned {} features, expected {}",
                features.len(),
                FREQNET_FEATURE_DIM
            );
        }

        Ok(features)
    }
}

/// Full FreqNet classifier producing a single "real" logit per crop
#[derive(Debug)]
pub struct OnnxFreqNetClassifier {
    session: OnnxSession,
}

impl OnnxFreqNetClassifier {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = OnnxSession::load(model_path, "FreqNet classifier")?;
        Ok(Self { session })
    }
}

impl FrameClassifier for OnnxFreqNetClassifier {
    fn name(&self) -> &str {
        "freqnet-classifier"
    }

    fn real_probability(&self, input: &Array4<f32>) -> Result<f32> {
        let mut outputs = self.session.run(input, &[0])?;
        let logits = outputs.pop().unwrap_or_default();

        let logit = match logits.as_slice() {
            [logit] => *logit,
            other => anyhow::bail!(
                "FreqNet classifier returned {} values, expected a single logit",
                other.len()
            ),
        };

        let probability = crate::detection::sigmoid(logit);
        debug!("Crop logit {:.4} -> p(real) {:.4}", logit, probability);
        Ok(probability)
    }
}
