// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Image normalizer tests
//!
//! Both extractor inputs must describe the same 224x224 content.

use crate::common::*;
use deepfake_detector::vision::preprocessing::{
    denormalize_for_clip, normalize_pair, to_freqnet_tensor, IMAGENET_MEAN, IMAGENET_STD,
};
use deepfake_detector::vision::{decode_data_uri_image, ImageError};
use image::{DynamicImage, Rgb, RgbImage};

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Test 1: Re-applying the ImageNet transform to the CLIP view gives back the FreqNet view
#[test]
fn test_round_trip_between_views() {
    let pair = normalize_pair(&gradient(300, 200));
    assert_eq!(pair.freqnet.shape(), &[1, 3, 224, 224]);

    for ((idx, freq), clip) in pair.freqnet.indexed_iter().zip(pair.clip.iter()) {
        let c = idx.1;
        let renormalized = (clip - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        assert!((renormalized - freq).abs() < 1e-4, "mismatch at {:?}", idx);
    }
}

/// Test 2: The CLIP view never leaves [0, 1]
#[test]
fn test_clip_view_is_clamped() {
    let mut tensor = to_freqnet_tensor(&gradient(32, 32));
    tensor.mapv_inplace(|v| v * 10.0);
    let clip = denormalize_for_clip(&tensor);
    assert!(clip.iter().all(|v| (0.0..=1.0).contains(v)));
}

/// Test 3: Data URIs and bare base64 decode to the same image
#[test]
fn test_data_uri_and_bare_base64() {
    let (with_prefix, _) = decode_data_uri_image(&tiny_png_data_uri()).unwrap();
    let (bare, _) = decode_data_uri_image(TINY_PNG_BASE64).unwrap();
    assert_eq!(with_prefix.to_rgb8().into_raw(), bare.to_rgb8().into_raw());
}

/// Test 4: Malformed payloads are input errors
#[test]
fn test_malformed_payloads() {
    assert!(matches!(
        decode_data_uri_image("data:image/png;base64,@@@@"),
        Err(ImageError::InvalidBase64(_))
    ));
    assert!(matches!(
        decode_data_uri_image(""),
        Err(ImageError::EmptyData)
    ));
}

/// Test 5: Non-square inputs are stretched, not cropped
#[test]
fn test_resize_is_exact() {
    let mut img = RgbImage::from_pixel(448, 224, Rgb([0, 0, 0]));
    for y in 0..224 {
        for x in 224..448 {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    let tensor = to_freqnet_tensor(&DynamicImage::ImageRgb8(img));
    let white = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
    let black = (0.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
    assert!((tensor[[0, 0, 100, 10]] - black).abs() < 1e-4);
    assert!((tensor[[0, 0, 100, 213]] - white).abs() < 1e-4);
}
