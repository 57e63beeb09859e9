// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared ONNX Runtime session loading
//!
//! All detector models run on the CPU execution provider.

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Intra-op threads per session
const INTRA_THREADS: usize = 4;

/// A loaded ONNX model with its resolved input/output names
pub struct OnnxSession {
    session: Mutex<Session>,
    input_name: String,
    output_names: Vec<String>,
    label: String,
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("label", &self.label)
            .field("input_name", &self.input_name)
            .field("output_names", &self.output_names)
            .finish_non_exhaustive()
    }
}

impl OnnxSession {
    /// Load an ONNX model from disk
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn load<P: AsRef<Path>>(model_path: P, label: &str) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("{} model not found: {}", label, model_path.display());
        }

        info!("Loading {} model from {}", label, model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(INTRA_THREADS)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load {} model from {}", label, model_path.display())
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        let output_names: Vec<String> = session
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();

        debug!(
            "{} model loaded - input: {}, outputs: {:?}",
            label, input_name, output_names
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_names,
            label: label.to_string(),
        })
    }

    /// Run the model and return the requested outputs, flattened
    ///
    /// `outputs` are indices into the model's output list; an index past
    /// the end is an error.
    pub fn run(&self, input: &Array4<f32>, outputs: &[usize]) -> Result<Vec<Vec<f32>>> {
        check_output_indices(&self.label, self.output_names.len(), outputs)?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("{} session lock poisoned: {}", self.label, e))?;

        let results = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .with_context(|| format!("{} inference failed", self.label))?;

        let mut flattened = Vec::with_capacity(outputs.len());
        for &index in outputs {
            let tensor = results[index]
                .try_extract_array::<f32>()
                .with_context(|| format!("Failed to extract {} output {}", self.label, index))?;
            flattened.push(tensor.iter().copied().collect());
        }

        Ok(flattened)
    }

    /// Index of the output with the given name, or `fallback` when no output has it
    ///
    /// Fails when the model has no output at the resolved index.
    pub fn output_index(&self, name: &str, fallback: usize) -> Result<usize> {
        resolve_output_index(&self.label, &self.output_names, name, fallback)
    }
}

fn resolve_output_index(label: &str, names: &[String], name: &str, fallback: usize) -> Result<usize> {
    let index = names.iter().position(|n| n == name).unwrap_or(fallback);
    if index >= names.len() {
        anyhow::bail!(
            "{} model has {} outputs: no {:?} output and no output {}",
            label,
            names.len(),
            name,
            fallback
        );
    }
    Ok(index)
}

fn check_output_indices(label: &str, available: usize, requested: &[usize]) -> Result<()> {
    if let Some(index) = requested.iter().find(|&&index| index >= available) {
        anyhow::bail!(
            "{} model has {} outputs, output {} was requested",
            label,
            available,
            index
        );
    }
    Ok(())
}
