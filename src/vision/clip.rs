// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CLIP ViT-L/14 image encoder

use anyhow::Result;
use ndarray::Array4;
use std::path::Path;

use super::extractor::FeatureExtractor;
use super::onnx::OnnxSession;
use super::preprocessing::normalize_for_clip;

/// Length of the CLIP image embedding
pub const CLIP_FEATURE_DIM: usize = 768;

/// Output name used by the HuggingFace `CLIPVisionModelWithProjection` export
const IMAGE_EMBEDS_OUTPUT: &str = "image_embeds";

/// CLIP image encoder backed by ONNX Runtime
///
/// Takes the de-normalised `[0, 1]` tensor and applies the CLIP image
/// processor steps (8-bit round-trip, 1/255 rescale, mean/std) before
/// inference.
#[derive(Debug)]
pub struct OnnxClipImageEncoder {
    session: OnnxSession,
    output_index: usize,
}

impl OnnxClipImageEncoder {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = OnnxSession::load(model_path, "CLIP image encoder")?;
        let output_index = session.output_index(IMAGE_EMBEDS_OUTPUT, 0)?;
        Ok(Self {
            session,
            output_index,
        })
    }
}

impl FeatureExtractor for OnnxClipImageEncoder {
    fn name(&self) -> &str {
        "clip-vit-large-patch14"
    }

    fn dimension(&self) -> usize {
        CLIP_FEATURE_DIM
    }

    fn extract(&self, input: &Array4<f32>) -> Result<Vec<f32>> {
        let normalized = normalize_for_clip(input);
        let mut outputs = self.session.run(&normalized, &[self.output_index])?;
        let embedding = outputs.pop().unwrap_or_default();

        if embedding.len() != CLIP_FEATURE_DIM {
            anyhow::bail!(
                "CLIP encoder returned {} features, expected {}",
                embedding.len(),
                CLIP_FEATURE_DIM
            );
        }

        Ok(embedding)
    }
}
