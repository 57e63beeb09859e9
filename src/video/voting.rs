// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-crop vote aggregation

use serde::{Deserialize, Serialize};

use crate::config::{
    DetectorConfig, DEFAULT_DECISION_THRESHOLD, DEFAULT_MIN_REAL_VOTES,
    DEFAULT_TIE_BREAK_THRESHOLD,
};

/// Outcome for a whole video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoVerdict {
    NoFaceDetected,
    Real,
    Fake,
}

impl VideoVerdict {
    /// User-facing sentence for the verdict
    pub fn message(&self) -> &'static str {
        match self {
            VideoVerdict::NoFaceDetected => "Not able to detect any faces in the video.",
            VideoVerdict::Real => "The video is likely real.",
            VideoVerdict::Fake => "The video is likely a deepfake.",
        }
    }
}

impl std::fmt::Display for VideoVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            VideoVerdict::NoFaceDetected => "no_face_detected",
            VideoVerdict::Real => "real",
            VideoVerdict::Fake => "fake",
        };
        f.write_str(label)
    }
}

/// Thresholds used by [`aggregate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VotingPolicy {
    /// A crop votes "real" when its probability is above this
    pub decision_threshold: f32,
    /// Mean probability a tie needs to exceed to be "real"
    pub tie_break_threshold: f64,
    /// Real votes needed when the counts differ (absolute, not a fraction)
    pub min_real_votes: usize,
}

impl Default for VotingPolicy {
    fn default() -> Self {
        Self {
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            tie_break_threshold: DEFAULT_TIE_BREAK_THRESHOLD,
            min_real_votes: DEFAULT_MIN_REAL_VOTES,
        }
    }
}

impl From<&DetectorConfig> for VotingPolicy {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            decision_threshold: config.decision_threshold,
            tie_break_threshold: config.tie_break_threshold,
            min_real_votes: config.min_real_votes,
        }
    }
}

/// Vote counts behind a verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub verdict: VideoVerdict,
    pub real_count: usize,
    pub fake_count: usize,
    /// Mean of all crop probabilities; `None` without crops
    pub mean_probability: Option<f32>,
}

/// Combine per-crop "real" probabilities into one verdict
///
/// - no crops: `NoFaceDetected`
/// - counts differ: `Real` iff `real_count >= min_real_votes`
/// - tie: `Real` iff mean probability `> tie_break_threshold`, with the
///   `f32` mean widened to `f64` before comparing
pub fn aggregate(probabilities: &[f32], policy: &VotingPolicy) -> VoteTally {
    if probabilities.is_empty() {
        return VoteTally {
            verdict: VideoVerdict::NoFaceDetected,
            real_count: 0,
            fake_count: 0,
            mean_probability: None,
        };
    }

    let real_count = probabilities
        .iter()
        .filter(|p| **p > policy.decision_threshold)
        .count();
    let fake_count = probabilities.len() - real_count;
    let mean = probabilities.iter().sum::<f32>() / probabilities.len() as f32;

    let is_real = if real_count != fake_count {
        real_count >= policy.min_real_votes
    } else {
        f64::from(mean) > policy.tie_break_threshold
    };

    VoteTally {
        verdict: if is_real {
            VideoVerdict::Real
        } else {
            VideoVerdict::Fake
        },
        real_count,
        fake_count,
        mean_probability: Some(mean),
    }
}
