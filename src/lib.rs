// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod detection;
pub mod version;
pub mod video;
pub mod vision;

// Re-export main types
pub use config::{AppConfig, DetectorConfig, ModelPaths, ServerConfig};
pub use detection::{FusionCheckpoint, FusionHead, HybridDetector, ImageVerdict};
pub use video::{VideoAnalysis, VideoPipeline, VideoVerdict, VotingPolicy};
pub use vision::{DetectorModelManager, FaceDetector, FeatureExtractor, FrameClassifier};
