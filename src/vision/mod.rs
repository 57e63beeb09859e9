// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision models and image handling
//!
//! This module provides:
//! - Data-URI / base64 image decoding
//! - FreqNet and CLIP tensor normalisation
//! - ONNX-backed FreqNet, CLIP and face detection models
//!
//! All models run on CPU via ONNX Runtime.

pub mod clip;
pub mod extractor;
pub mod face;
pub mod freqnet;
pub mod image_utils;
pub mod model_manager;
pub mod onnx;
pub mod preprocessing;

pub use clip::OnnxClipImageEncoder;
pub use extractor::{FeatureExtractor, FrameClassifier};
pub use face::{FaceDetector, OnnxFaceDetector, RelativeBox};
pub use freqnet::{OnnxFreqNet, OnnxFreqNetClassifier};
pub use image_utils::{
    decode_base64_image, decode_data_uri_image, decode_image_bytes, detect_format, ImageError,
    ImageInfo,
};
pub use model_manager::{CheckpointInfo, DetectorModelInfo, DetectorModelManager};
pub use preprocessing::{normalize_pair, to_freqnet_tensor, NormalizedPair};
