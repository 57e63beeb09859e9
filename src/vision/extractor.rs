// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Capability interfaces for the pretrained networks
//!
//! The fusion classifier and the video pipeline only depend on these traits,
//! so tests can swap the ONNX-backed models for deterministic stubs.

use anyhow::Result;
use ndarray::Array4;

/// Maps an NCHW image tensor to a fixed-length feature vector
pub trait FeatureExtractor: Send + Sync {
    /// Short model name used in logs and `/v1/models`
    fn name(&self) -> &str;

    /// Length of the vector returned by [`FeatureExtractor::extract`]
    fn dimension(&self) -> usize;

    /// Extract features from a `[1, 3, H, W]` tensor
    fn extract(&self, input: &Array4<f32>) -> Result<Vec<f32>>;
}

/// Scores a single face crop
pub trait FrameClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Probability in (0, 1) that the crop is real
    fn real_probability(&self, input: &Array4<f32>) -> Result<f32>;
}
