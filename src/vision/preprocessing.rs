// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image normalisation for the FreqNet and CLIP extractors
//!
//! Both extractors see the same 224x224 content with different statistics:
//! - FreqNet: pixels scaled to [0, 1] then normalised with ImageNet mean/std
//! - CLIP: the FreqNet tensor mapped back to [0, 1] (clamped), then run
//!   through the CLIP image processor steps inside the encoder

use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, Axis};

/// Side length of the square model input
pub const INPUT_SIZE: u32 = 224;

/// ImageNet mean used by FreqNet
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet std used by FreqNet
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Mean used by the CLIP image processor
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// Std used by the CLIP image processor
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];

/// Rescale factor of the CLIP image processor
///
/// The processor applies it to every input, including tensors that are
/// already in [0, 1]; the fusion head was trained on features from those
/// rescaled inputs.
pub const CLIP_RESCALE_FACTOR: f32 = 1.0 / 255.0;

/// The two views of one image handed to the fusion classifier
#[derive(Debug, Clone)]
pub struct NormalizedPair {
    /// ImageNet-normalised NCHW tensor for FreqNet
    pub freqnet: Array4<f32>,
    /// De-normalised [0, 1] NCHW tensor for CLIP
    pub clip: Array4<f32>,
}

/// Resize to 224x224 and normalise with ImageNet statistics
///
/// Returns a `[1, 3, 224, 224]` tensor.
pub fn to_freqnet_tensor(image: &DynamicImage) -> Array4<f32> {
    let resized = image.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let scaled = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (scaled - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}

/// Invert the ImageNet normalisation and clamp to [0, 1]
pub fn denormalize_for_clip(tensor: &Array4<f32>) -> Array4<f32> {
    map_channels(tensor, |c, v| (v * IMAGENET_STD[c] + IMAGENET_MEAN[c]).clamp(0.0, 1.0))
}

/// Apply the CLIP image processor to a [0, 1] tensor
///
/// Values pass through 8-bit pixels (truncated, as the processor's PIL
/// round-trip does), are multiplied by [`CLIP_RESCALE_FACTOR`] and then
/// normalised with CLIP's mean/std.
pub fn normalize_for_clip(tensor: &Array4<f32>) -> Array4<f32> {
    map_channels(tensor, |c, v| {
        let pixel = (v * 255.0).clamp(0.0, 255.0).trunc() / 255.0;
        (pixel * CLIP_RESCALE_FACTOR - CLIP_MEAN[c]) / CLIP_STD[c]
    })
}

/// Produce both extractor inputs for one decoded image
pub fn normalize_pair(image: &DynamicImage) -> NormalizedPair {
    let freqnet = to_freqnet_tensor(image);
    let clip = denormalize_for_clip(&freqnet);
    NormalizedPair { freqnet, clip }
}

/// Apply `f(channel, value)` to every element of an NCHW tensor
fn map_channels<F>(tensor: &Array4<f32>, f: F) -> Array4<f32>
where
    F: Fn(usize, f32) -> f32,
{
    let mut out = tensor.clone();
    for (c, mut plane) in out.axis_iter_mut(Axis(1)).enumerate() {
        plane.mapv_inplace(|v| f(c, v));
    }
    out
}
