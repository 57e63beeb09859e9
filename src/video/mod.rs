// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Video deepfake analysis
//!
//! Frames are sampled evenly across the clip, faces are cropped with an
//! enlarged box, each crop is scored by the FreqNet classifier and the scores
//! are combined by a vote.

pub mod pipeline;
pub mod sampler;
pub mod source;
pub mod voting;

pub use pipeline::{VideoAnalysis, VideoPipeline};
pub use sampler::{expand_box, extract_face_crops, sample_indices, FaceCrop, PixelBox};
pub use source::{is_supported_container, FfmpegFrameSource, FrameSource, VideoError, SUPPORTED_CONTAINERS};
pub use voting::{aggregate, VideoVerdict, VoteTally, VotingPolicy};
