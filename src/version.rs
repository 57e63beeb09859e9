// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the deepfake detector

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-hybrid-freqnet-clip-2025-11-02";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-02";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "single-image-analysis",
    "freqnet-clip-fusion",
    "video-analysis",
    "face-cropping",
    "frame-voting",
    "chrome-extension-cors",
];

/// Get version information as a formatted string
pub fn get_version_info() -> String {
    format!(
        "Deepfake Detector {} ({}), built {}",
        VERSION_NUMBER, VERSION, BUILD_DATE
    )
}
