// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hybrid FreqNet + CLIP deepfake classification
//!
//! - `fusion`: L2-normalised feature fusion and the 1280 -> 1 linear head
//! - `checkpoint`: loading the learned head parameters
//! - `verdict`: mapping a "real" probability to a label and confidence

pub mod checkpoint;
pub mod fusion;
pub mod verdict;

pub use checkpoint::{CheckpointError, CheckpointFile, FusionCheckpoint, TensorEntry};
pub use fusion::{
    fuse, l2_normalize, sigmoid, FusionHead, HybridDetector, CLIP_DIM, FREQNET_DIM, FUSED_DIM,
};
pub use verdict::ImageVerdict;
