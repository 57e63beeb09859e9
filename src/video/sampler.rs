// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame sampling and face cropping

use image::{imageops, RgbImage};
use serde::Serialize;
use tracing::{debug, warn};

use super::source::{FrameSource, VideoError};
use crate::vision::face::{FaceDetector, RelativeBox};

/// `count` frame indices evenly spaced over `0..=total-1`
///
/// Index `i` is `round(i * (total - 1) / (count - 1))` with exact halves
/// rounded to the even neighbour, so 6 frames sampled 3 times read frames
/// 0, 2 and 5. A single sample reads frame 0. Indices repeat when
/// `count > total`.
pub fn sample_indices(total: usize, count: usize) -> Vec<usize> {
    if total == 0 || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![0];
    }

    let span = total - 1;
    let steps = count - 1;
    (0..count)
        .map(|i| round_half_even(i * span, steps))
        .collect()
}

/// `numerator / denominator` rounded to the nearest integer, ties to even
fn round_half_even(numerator: usize, denominator: usize) -> usize {
    let quotient = numerator / denominator;
    let twice_remainder = 2 * (numerator % denominator);
    if twice_remainder > denominator || (twice_remainder == denominator && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

/// A crop rectangle in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Enlarge a detection around its centre and clamp it to the frame
///
/// Coordinates are truncated to whole pixels at each step. A box pushed past
/// the left/top edge is moved to 0 (keeping its size); width/height are then
/// cut at the right/bottom edge. Returns `None` when nothing is left.
pub fn expand_box(
    detection: &RelativeBox,
    frame_width: u32,
    frame_height: u32,
    scaling: f32,
) -> Option<PixelBox> {
    let (x, width) = expand_axis(detection.xmin, detection.width, frame_width, scaling);
    let (y, height) = expand_axis(detection.ymin, detection.height, frame_height, scaling);

    if width <= 0 || height <= 0 {
        return None;
    }

    Some(PixelBox {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    })
}

/// One axis of [`expand_box`]: returns (start, length) in pixels
fn expand_axis(rel_start: f32, rel_len: f32, extent: u32, scaling: f32) -> (i64, i64) {
    let extent_f = extent as f64;
    let start = (rel_start as f64 * extent_f) as i64;
    let len = (rel_len as f64 * extent_f) as i64;
    let centre = start + len.div_euclid(2);

    let scaled = len as f64 * scaling as f64;
    let new_start = ((centre as f64 - scaled / 2.0) as i64).clamp(0, extent as i64);
    let new_len = (scaled as i64).min(extent as i64 - new_start);

    (new_start, new_len)
}

/// A face region cut from a sampled frame
#[derive(Debug, Clone)]
pub struct FaceCrop {
    pub frame_index: usize,
    /// Position of the face in the detector's output for that frame
    pub face_index: usize,
    pub bbox: PixelBox,
    pub image: RgbImage,
}

/// Crops collected from one video
#[derive(Debug, Clone, Default)]
pub struct CropSet {
    pub crops: Vec<FaceCrop>,
    /// Number of frame indices requested
    pub frames_sampled: usize,
    /// Frames that failed to decode or to run through the detector
    pub frames_skipped: usize,
}

/// Sample `sample_count` frames and crop every detected face
///
/// Crops follow frame order, then detector order within a frame. Frames that
/// fail to decode or detect are logged and skipped.
///
/// # Errors
/// `VideoError::NoFrames` when the source is empty.
pub fn extract_face_crops(
    source: &mut dyn FrameSource,
    detector: &dyn FaceDetector,
    sample_count: usize,
    box_scaling: f32,
) -> Result<CropSet, VideoError> {
    let total = source.frame_count();
    if total == 0 {
        return Err(VideoError::NoFrames);
    }

    let indices = sample_indices(total, sample_count);
    debug!("Sampling {} of {} frames: {:?}", indices.len(), total, indices);

    let mut set = CropSet {
        frames_sampled: indices.len(),
        ..CropSet::default()
    };

    for frame_index in indices {
        let frame = match source.read_frame(frame_index) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                warn!("Frame {} is past the end of the stream", frame_index);
                set.frames_skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("Skipping frame {}: {}", frame_index, e);
                set.frames_skipped += 1;
                continue;
            }
        };

        let faces = match detector.detect(&frame) {
            Ok(faces) => faces,
            Err(e) => {
                warn!("Face detection failed on frame {}: {:#}", frame_index, e);
                set.frames_skipped += 1;
                continue;
            }
        };

        for (face_index, face) in faces.iter().enumerate() {
            let Some(bbox) = expand_box(face, frame.width(), frame.height(), box_scaling) else {
                warn!(
                    "Empty crop for face {} on frame {}, skipping",
                    face_index, frame_index
                );
                continue;
            };

            let image = imageops::crop_imm(&frame, bbox.x, bbox.y, bbox.width, bbox.height)
                .to_image();
            set.crops.push(FaceCrop {
                frame_index,
                face_index,
                bbox,
                image,
            });
        }
    }

    debug!(
        "Collected {} face crop(s), {} frame(s) skipped",
        set.crops.len(),
        set.frames_skipped
    );
    Ok(set)
}
