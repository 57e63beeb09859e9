// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Face detection for video frames
//!
//! Boxes are reported relative to the frame (0.0-1.0) so the sampler can
//! expand them in pixel space against the original frame size.

use anyhow::{Context, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::onnx::OnnxSession;

/// UltraFace RFB-320 input width
pub const FACE_INPUT_WIDTH: u32 = 320;

/// UltraFace RFB-320 input height
pub const FACE_INPUT_HEIGHT: u32 = 240;

/// IoU above which overlapping detections are suppressed
pub const NMS_IOU_THRESHOLD: f32 = 0.3;

/// A detected face, relative to frame width/height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeBox {
    pub xmin: f32,
    pub ymin: f32,
    pub width: f32,
    pub height: f32,
    /// Detector confidence (0.0-1.0)
    pub score: f32,
}

impl RelativeBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &RelativeBox) -> f32 {
        let x1 = self.xmin.max(other.xmin);
        let y1 = self.ymin.max(other.ymin);
        let x2 = (self.xmin + self.width).min(other.xmin + other.width);
        let y2 = (self.ymin + self.height).min(other.ymin + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Finds faces in a single RGB frame
pub trait FaceDetector: Send + Sync {
    /// Detect faces, returning boxes relative to the frame size
    fn detect(&self, frame: &RgbImage) -> Result<Vec<RelativeBox>>;
}

/// Greedy non-maximum suppression, highest score first
pub fn non_max_suppression(mut boxes: Vec<RelativeBox>, iou_threshold: f32) -> Vec<RelativeBox> {
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<RelativeBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// UltraFace (version-RFB-320) face detector backed by ONNX Runtime
///
/// Outputs are `scores [1, N, 2]` (background, face) and
/// `boxes [1, N, 4]` as relative corner coordinates.
#[derive(Debug)]
pub struct OnnxFaceDetector {
    session: OnnxSession,
    scores_index: usize,
    boxes_index: usize,
    min_confidence: f32,
}

impl OnnxFaceDetector {
    pub fn load<P: AsRef<Path>>(model_path: P, min_confidence: f32) -> Result<Self> {
        let session = OnnxSession::load(model_path, "Face detector")?;

        let scores_index = session.output_index("scores", 0)?;
        let boxes_index = session.output_index("boxes", 1)?;

        Ok(Self {
            session,
            scores_index,
            boxes_index,
            min_confidence: min_confidence.clamp(0.0, 1.0),
        })
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// Resize to 320x240 and scale pixels with `(p - 127) / 128`
    pub fn preprocess(frame: &RgbImage) -> Array4<f32> {
        let resized = image::imageops::resize(
            frame,
            FACE_INPUT_WIDTH,
            FACE_INPUT_HEIGHT,
            FilterType::Triangle,
        );

        let mut tensor = Array4::zeros((
            1,
            3,
            FACE_INPUT_HEIGHT as usize,
            FACE_INPUT_WIDTH as usize,
        ));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - 127.0) / 128.0;
            }
        }
        tensor
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<RelativeBox>> {
        let input = Self::preprocess(frame);
        let outputs = self
            .session
            .run(&input, &[self.scores_index, self.boxes_index])
            .context("Face detection failed")?;

        let (scores, boxes) = match outputs.as_slice() {
            [scores, boxes] => (scores, boxes),
            _ => anyhow::bail!("Face detector returned unexpected outputs"),
        };

        let faces = parse_detections(scores, boxes, self.min_confidence)?;
        let faces = non_max_suppression(faces, NMS_IOU_THRESHOLD);
        debug!("Detected {} face(s)", faces.len());
        Ok(faces)
    }
}

/// Turn flattened UltraFace outputs into relative boxes above `min_confidence`
fn parse_detections(scores: &[f32], boxes: &[f32], min_confidence: f32) -> Result<Vec<RelativeBox>> {
    if scores.len() % 2 != 0 || boxes.len() % 4 != 0 || scores.len() / 2 != boxes.len() / 4 {
        anyhow::bail!(
            "Mismatched face detector outputs: {} scores, {} box values",
            scores.len(),
            boxes.len()
        );
    }

    let faces = scores
        .chunks_exact(2)
        .zip(boxes.chunks_exact(4))
        .filter(|(score, _)| score[1] >= min_confidence)
        .map(|(score, corners)| {
            let x1 = corners[0].clamp(0.0, 1.0);
            let y1 = corners[1].clamp(0.0, 1.0);
            let x2 = corners[2].clamp(0.0, 1.0);
            let y2 = corners[3].clamp(0.0, 1.0);
            RelativeBox {
                xmin: x1,
                ymin: y1,
                width: (x2 - x1).max(0.0),
                height: (y2 - y1).max(0.0),
                score: score[1],
            }
        })
        .collect();

    Ok(faces)
}
