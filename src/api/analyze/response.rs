// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::detection::ImageVerdict;

/// Response body for POST /analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub is_deepfake: bool,
    /// Percent, two decimals
    pub confidence: f64,
}

impl From<ImageVerdict> for AnalyzeResponse {
    fn from(verdict: ImageVerdict) -> Self {
        Self {
            is_deepfake: verdict.is_deepfake,
            confidence: verdict.confidence,
        }
    }
}
