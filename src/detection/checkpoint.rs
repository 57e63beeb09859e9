// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fusion head checkpoints
//!
//! Checkpoints are JSON documents holding the trained `fc` layer:
//!
//! ```json
//! {
//!   "model_state_dict": {
//!     "fc.weight": { "shape": [1, 1280], "data": [ ... ] },
//!     "fc.bias":   { "shape": [1],       "data": [ ... ] }
//!   },
//!   "epoch": 12
//! }
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use super::fusion::{FusionHead, FUSED_DIM};

pub const WEIGHT_KEY: &str = "fc.weight";
pub const BIAS_KEY: &str = "fc.bias";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    #[error("Failed to read checkpoint: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid checkpoint JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Checkpoint is missing tensor '{0}'")]
    MissingTensor(String),

    #[error("Tensor '{name}' has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Tensor '{name}' declares {declared} values but holds {actual}")]
    DataLength {
        name: String,
        declared: usize,
        actual: usize,
    },

    #[error("Tensor '{0}' contains non-finite values")]
    NonFinite(String),
}

/// One serialised tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorEntry {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorEntry {
    fn check(&self, name: &str, expected: &[usize]) -> Result<(), CheckpointError> {
        if self.shape != expected {
            return Err(CheckpointError::ShapeMismatch {
                name: name.to_string(),
                expected: expected.to_vec(),
                actual: self.shape.clone(),
            });
        }
        let declared: usize = self.shape.iter().product();
        if declared != self.data.len() {
            return Err(CheckpointError::DataLength {
                name: name.to_string(),
                declared,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// On-disk checkpoint document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub model_state_dict: BTreeMap<String, TensorEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
}

impl CheckpointFile {
    /// Build a document from an in-memory head
    pub fn from_head(head: &FusionHead, epoch: Option<u64>) -> Self {
        let mut model_state_dict = BTreeMap::new();
        model_state_dict.insert(
            WEIGHT_KEY.to_string(),
            TensorEntry {
                shape: vec![1, FUSED_DIM],
                data: head.weight().to_vec(),
            },
        );
        model_state_dict.insert(
            BIAS_KEY.to_string(),
            TensorEntry {
                shape: vec![1],
                data: vec![head.bias()],
            },
        );
        Self {
            model_state_dict,
            epoch,
        }
    }

    fn tensor(&self, key: &str) -> Result<&TensorEntry, CheckpointError> {
        self.model_state_dict
            .get(key)
            .ok_or_else(|| CheckpointError::MissingTensor(key.to_string()))
    }

    /// Validate shapes and build the head
    pub fn to_head(&self) -> Result<FusionHead, CheckpointError> {
        let weight = self.tensor(WEIGHT_KEY)?;
        weight.check(WEIGHT_KEY, &[1, FUSED_DIM])?;

        let bias = self.tensor(BIAS_KEY)?;
        bias.check(BIAS_KEY, &[1])?;

        FusionHead::new(weight.data.clone(), bias.data[0])
    }
}

/// A loaded fusion head with provenance
#[derive(Debug, Clone)]
pub struct FusionCheckpoint {
    pub head: FusionHead,
    pub epoch: Option<u64>,
    /// Hex SHA-256 of the checkpoint bytes
    pub sha256: String,
}

impl FusionCheckpoint {
    /// Read and validate a checkpoint file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CheckpointError::NotFound(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        let checkpoint = Self::from_bytes(&bytes)?;

        info!(
            "Loaded fusion checkpoint from {} (epoch: {:?}, sha256: {})",
            path.display(),
            checkpoint.epoch,
            &checkpoint.sha256[..12]
        );
        Ok(checkpoint)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let file: CheckpointFile = serde_json::from_slice(bytes)?;
        let head = file.to_head()?;
        Ok(Self {
            head,
            epoch: file.epoch,
            sha256: hex::encode(Sha256::digest(bytes)),
        })
    }

    /// Write a head to disk in checkpoint format
    pub fn save<P: AsRef<Path>>(
        head: &FusionHead,
        epoch: Option<u64>,
        path: P,
    ) -> Result<(), CheckpointError> {
        let json = serde_json::to_vec(&CheckpointFile::from_head(head, epoch))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
