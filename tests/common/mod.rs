// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fixtures: deterministic extractors, scripted classifiers and
//! mockall doubles for the face detector and frame source seams.
#![allow(dead_code)]

use anyhow::Result;
use deepfake_detector::detection::{FusionHead, HybridDetector, CLIP_DIM, FREQNET_DIM};
use deepfake_detector::video::{FrameSource, VideoError};
use deepfake_detector::vision::{FaceDetector, FeatureExtractor, FrameClassifier, RelativeBox};
use image::{Rgb, RgbImage};
use mockall::mock;
use ndarray::Array4;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// 1x1 red PNG image (base64)
pub const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

pub fn tiny_png_data_uri() -> String {
    format!("data:image/png;base64,{}", TINY_PNG_BASE64)
}

/// Extractor returning a fixed vector regardless of input
pub struct FixedExtractor {
    name: String,
    features: Vec<f32>,
}

impl FixedExtractor {
    pub fn new(name: &str, features: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            features,
        }
    }

    pub fn constant(name: &str, dim: usize, value: f32) -> Self {
        Self::new(name, vec![value; dim])
    }
}

impl FeatureExtractor for FixedExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.features.len()
    }

    fn extract(&self, _input: &Array4<f32>) -> Result<Vec<f32>> {
        Ok(self.features.clone())
    }
}

/// Extractor whose features scale with the mean of the input tensor
pub struct MeanExtractor {
    dim: usize,
}

impl MeanExtractor {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl FeatureExtractor for MeanExtractor {
    fn name(&self) -> &str {
        "mean"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn extract(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let mean = input.mean().unwrap_or(0.0);
        Ok((0..self.dim).map(|i| mean + i as f32 * 1e-3).collect())
    }
}

/// Head with zero weights: the probability is `sigmoid(bias)`
pub fn bias_only_head(bias: f32) -> FusionHead {
    FusionHead::new(vec![0.0; FREQNET_DIM + CLIP_DIM], bias).unwrap()
}

/// Hybrid detector that always yields `sigmoid(bias)`
pub fn constant_detector(bias: f32) -> HybridDetector {
    HybridDetector::new(
        Arc::new(FixedExtractor::constant("freqnet-stub", FREQNET_DIM, 1.0)),
        Arc::new(FixedExtractor::constant("clip-stub", CLIP_DIM, 1.0)),
        bias_only_head(bias),
    )
    .unwrap()
}

/// Returns scripted probabilities in order, then `fallback`
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<f32>>,
    fallback: f32,
}

impl ScriptedClassifier {
    pub fn new(script: &[f32]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            fallback: 0.5,
        }
    }

    pub fn constant(probability: f32) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: probability,
        }
    }
}

impl FrameClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    fn real_probability(&self, _input: &Array4<f32>) -> Result<f32> {
        let mut script = self.script.lock().unwrap();
        Ok(script.pop_front().unwrap_or(self.fallback))
    }
}

/// Classifier that always fails
pub struct FailingClassifier;

impl FrameClassifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn real_probability(&self, _input: &Array4<f32>) -> Result<f32> {
        anyhow::bail!("classifier exploded")
    }
}

mock! {
    pub Detector {}

    impl FaceDetector for Detector {
        fn detect(&self, frame: &RgbImage) -> Result<Vec<RelativeBox>>;
    }
}

mock! {
    pub Source {}

    impl FrameSource for Source {
        fn frame_count(&self) -> usize;
        fn read_frame(&mut self, index: usize) -> std::result::Result<Option<RgbImage>, VideoError>;
    }
}

pub fn gray_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([128, 128, 128]))
}

pub fn face(xmin: f32, ymin: f32, width: f32, height: f32) -> RelativeBox {
    RelativeBox {
        xmin,
        ymin,
        width,
        height,
        score: 0.99,
    }
}

/// Source with `total` frames where every read succeeds
pub fn uniform_source(total: usize, width: u32, height: u32) -> MockSource {
    let mut source = MockSource::new();
    source.expect_frame_count().return_const(total);
    source
        .expect_read_frame()
        .returning(move |_| Ok(Some(gray_frame(width, height))));
    source
}

/// Detector that finds one centred face in every frame
pub fn one_face_detector() -> MockDetector {
    let mut detector = MockDetector::new();
    detector
        .expect_detect()
        .returning(|_| Ok(vec![face(0.375, 0.375, 0.25, 0.25)]));
    detector
}
