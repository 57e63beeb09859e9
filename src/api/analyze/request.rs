// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image analysis request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::vision::image_utils::MAX_IMAGE_SIZE;

/// Longest accepted payload: base64 of the largest image plus a data-URI prefix
const MAX_PAYLOAD_CHARS: usize = MAX_IMAGE_SIZE / 3 * 4 + 1024;

/// Request for single-image analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Data URI (`data:image/png;base64,...`) or bare base64 image
    #[serde(default)]
    pub image: Option<String>,
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let image = match self.image.as_deref().map(str::trim) {
            Some(image) if !image.is_empty() => image,
            _ => {
                return Err(ApiError::ValidationError {
                    field: "image".to_string(),
                    message: "image is required".to_string(),
                })
            }
        };

        if image.len() > MAX_PAYLOAD_CHARS {
            return Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: format!("image exceeds maximum size of {} bytes", MAX_IMAGE_SIZE),
            });
        }

        Ok(())
    }
}
