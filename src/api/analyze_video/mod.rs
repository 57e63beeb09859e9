// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Video analysis endpoint
//!
//! Provides POST /v1/analyze-video (multipart upload, field `video`).

pub mod handler;
pub mod response;

pub use handler::{analyze_video_handler, VIDEO_FIELD};
pub use response::AnalyzeVideoResponse;
