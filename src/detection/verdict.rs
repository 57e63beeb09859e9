// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-image decision rule

use serde::{Deserialize, Serialize};

/// Label and confidence for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVerdict {
    pub is_deepfake: bool,
    /// Probability of the predicted class, in percent, two decimals
    pub confidence: f64,
    /// Raw "real" probability from the classifier
    pub probability: f32,
}

impl ImageVerdict {
    /// `probability <= threshold` is a deepfake
    pub fn from_probability(probability: f32, threshold: f32) -> Self {
        let is_deepfake = probability <= threshold;
        let p = probability as f64;
        let confidence = if is_deepfake {
            100.0 - p * 100.0
        } else {
            p * 100.0
        };

        Self {
            is_deepfake,
            confidence: round_to_hundredths(confidence),
            probability,
        }
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
