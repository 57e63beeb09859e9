// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::video::{VideoAnalysis, VideoVerdict};

/// Response body for POST /v1/analyze-video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeVideoResponse {
    pub verdict: VideoVerdict,
    /// User-facing sentence for the verdict
    pub message: String,
    pub real_count: usize,
    pub fake_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_probability: Option<f32>,
    pub crops_analyzed: usize,
    pub frames_sampled: usize,
}

impl From<VideoAnalysis> for AnalyzeVideoResponse {
    fn from(analysis: VideoAnalysis) -> Self {
        Self {
            verdict: analysis.verdict,
            message: analysis.message,
            real_count: analysis.real_count,
            fake_count: analysis.fake_count,
            mean_probability: analysis.mean_probability,
            crops_analyzed: analysis.crops_analyzed,
            frames_sampled: analysis.frames_sampled,
        }
    }
}
