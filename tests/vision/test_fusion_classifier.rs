// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Fusion classifier tests
//!
//! Uses deterministic stub extractors so the fusion, head and decision rule
//! can be checked without the pretrained networks.

use crate::common::*;
use deepfake_detector::detection::{
    fuse, sigmoid, FusionCheckpoint, FusionHead, HybridDetector, ImageVerdict, CLIP_DIM,
    FREQNET_DIM, FUSED_DIM,
};
use deepfake_detector::vision::preprocessing::normalize_pair;
use image::{DynamicImage, Rgb, RgbImage};
use std::sync::Arc;
use tempfile::TempDir;

/// +1 on the FreqNet half, -1 on the CLIP half
fn signed_head() -> FusionHead {
    let mut weight = vec![1.0; FREQNET_DIM];
    weight.extend(vec![-1.0; CLIP_DIM]);
    FusionHead::new(weight, 0.0).unwrap()
}

fn ramp(len: usize, offset: f32) -> Vec<f32> {
    (0..len).map(|i| offset + i as f32 / len as f32).collect()
}

/// Test 1: The fused vector is [FreqNet-512, CLIP-768], each unit length
#[test]
fn test_fused_layout_and_norms() {
    let fused = fuse(&ramp(FREQNET_DIM, 1.0), &ramp(CLIP_DIM, 5.0));
    assert_eq!(fused.len(), FUSED_DIM);

    let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm(&fused[..FREQNET_DIM]) - 1.0).abs() < 1e-5);
    assert!((norm(&fused[FREQNET_DIM..]) - 1.0).abs() < 1e-5);
}

/// Test 2: Swapping the concatenation order changes the logit
#[test]
fn test_concatenation_order_matters() {
    let head = signed_head();
    let freq = ramp(FREQNET_DIM, 0.5);
    let clip = ramp(CLIP_DIM, 2.0);

    let forward = head.logit(&fuse(&freq, &clip)).unwrap();
    let swapped = head.logit(&fuse(&clip, &freq)).unwrap();
    assert!((forward - swapped).abs() > 1.0);
}

/// Test 3: The detector feeds FreqNet into the first half of the head
#[test]
fn test_detector_routes_extractors() {
    let detector = HybridDetector::new(
        Arc::new(FixedExtractor::constant("freq", FREQNET_DIM, 1.0)),
        Arc::new(FixedExtractor::constant("clip", CLIP_DIM, 1.0)),
        signed_head(),
    )
    .unwrap();

    let pair = normalize_pair(&DynamicImage::new_rgb8(8, 8));
    let logit = detector.classify(&pair.freqnet, &pair.clip).unwrap();
    let expected = (FREQNET_DIM as f32).sqrt() - (CLIP_DIM as f32).sqrt();
    assert!((logit - expected).abs() < 1e-3);
}

/// Test 4: Extractors are checked for the expected dimensions
#[test]
fn test_swapped_extractors_are_rejected() {
    let result = HybridDetector::new(
        Arc::new(FixedExtractor::constant("clip", CLIP_DIM, 1.0)),
        Arc::new(FixedExtractor::constant("freq", FREQNET_DIM, 1.0)),
        signed_head(),
    );
    assert!(result.is_err());
}

/// Test 5: p = 0.5 is a deepfake, p = 0.50001 is real
#[test]
fn test_decision_boundary() {
    assert!(ImageVerdict::from_probability(0.5, 0.5).is_deepfake);
    assert!(!ImageVerdict::from_probability(0.50001, 0.5).is_deepfake);
}

/// Test 6: Confidence is the probability of the predicted class
#[test]
fn test_confidence_examples() {
    let fake = ImageVerdict::from_probability(0.3, 0.5);
    assert!(fake.is_deepfake);
    assert_eq!(fake.confidence, 70.0);

    let real = ImageVerdict::from_probability(0.8, 0.5);
    assert!(!real.is_deepfake);
    assert_eq!(real.confidence, 80.0);
}

/// Test 7: A zero logit sits on the boundary and is labelled a deepfake
#[test]
fn test_zero_logit_is_deepfake() {
    let detector = constant_detector(0.0);
    let verdict = detector
        .analyze_image(&DynamicImage::new_rgb8(4, 4), 0.5)
        .unwrap();
    assert_eq!(verdict.probability, 0.5);
    assert!(verdict.is_deepfake);
    assert_eq!(verdict.confidence, 50.0);
}

/// Test 8: A detector built from a checkpoint file scores images
#[test]
fn test_detector_from_checkpoint_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fusion.json");
    FusionCheckpoint::save(&bias_only_head(-1.5), Some(4), &path).unwrap();

    let checkpoint = FusionCheckpoint::load(&path).unwrap();
    assert_eq!(checkpoint.epoch, Some(4));

    let detector = HybridDetector::new(
        Arc::new(MeanExtractor::new(FREQNET_DIM)),
        Arc::new(MeanExtractor::new(CLIP_DIM)),
        checkpoint.head,
    )
    .unwrap();

    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([200, 10, 10])));
    let p = detector.real_probability(&image).unwrap();
    assert!((p - sigmoid(-1.5)).abs() < 1e-6);
}

/// Test 9: Extractor errors propagate
#[test]
fn test_extractor_failure_propagates() {
    struct Broken;
    impl deepfake_detector::vision::FeatureExtractor for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn dimension(&self) -> usize {
            FREQNET_DIM
        }
        fn extract(&self, _input: &ndarray::Array4<f32>) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("weights missing")
        }
    }

    let detector = HybridDetector::new(
        Arc::new(Broken),
        Arc::new(FixedExtractor::constant("clip", CLIP_DIM, 1.0)),
        signed_head(),
    )
    .unwrap();

    let err = detector
        .real_probability(&DynamicImage::new_rgb8(4, 4))
        .unwrap_err();
    assert!(format!("{:#}", err).contains("weights missing"));
}

/// Test 10: Real pretrained models
#[test]
#[ignore] // Requires the FreqNet, CLIP and fusion checkpoint files under ./models
fn test_real_models_classify_image() {
    use deepfake_detector::vision::{OnnxClipImageEncoder, OnnxFreqNet};

    let checkpoint = FusionCheckpoint::load("./models/fusion/checkpoint.json").unwrap();
    let detector = HybridDetector::new(
        Arc::new(OnnxFreqNet::load("./models/freqnet/freqnet_features.onnx").unwrap()),
        Arc::new(OnnxClipImageEncoder::load(
            "./models/clip-vit-large-patch14/vision_model.onnx",
        ).unwrap()),
        checkpoint.head,
    )
    .unwrap();

    let verdict = detector
        .analyze_image(&DynamicImage::new_rgb8(224, 224), 0.5)
        .unwrap();
    assert!((0.0..=100.0).contains(&verdict.confidence));
}
