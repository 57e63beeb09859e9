// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image analysis endpoint handler

use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, error, info, warn};

use super::request::AnalyzeRequest;
use super::response::AnalyzeResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::decode_data_uri_image;

/// POST /analyze - Classify one image as real or deepfake
///
/// # Request
/// - `image`: Data URI or bare base64 image (required)
///
/// # Response
/// - `isDeepfake`: true when the real probability is at or below the threshold
/// - `confidence`: Probability of the predicted class, in percent
///
/// # Errors
/// - 400 Bad Request: Missing or undecodable image
/// - 503 Service Unavailable: Image detector not loaded
/// - 500 Internal Server Error: Inference failed
pub async fn analyze_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, String)> {
    // 1. Validate request
    if let Err(e) = request.validate() {
        warn!("Analyze validation failed: {}", e);
        return Err(e.into_parts());
    }

    // 2. Get the detector
    let manager = state.model_manager().await.ok_or_else(|| {
        warn!("Detector models not available");
        ApiError::ServiceUnavailable("Detector models not loaded".to_string()).into_parts()
    })?;

    let detector = manager.get_hybrid_detector().ok_or_else(|| {
        warn!("Image detector not loaded");
        ApiError::ServiceUnavailable("Image detector not loaded".to_string()).into_parts()
    })?;
    let threshold = manager.config().decision_threshold;

    // 3. Decode the image
    let payload = request.image.unwrap_or_default();
    let (image, info) = decode_data_uri_image(&payload).map_err(|e| {
        warn!("Failed to decode image: {}", e);
        ApiError::InvalidRequest(format!("Invalid image: {}", e)).into_parts()
    })?;
    debug!(
        "Decoded image: {}x{} {:?}, {} bytes",
        info.width, info.height, info.format, info.size_bytes
    );

    // 4. Run inference off the async runtime
    let verdict = tokio::task::spawn_blocking(move || detector.analyze_image(&image, threshold))
        .await
        .map_err(|e| {
            error!("Image analysis task failed: {}", e);
            ApiError::InternalError(e.to_string()).into_parts()
        })?
        .map_err(|e| {
            error!("Image analysis failed: {:#}", e);
            ApiError::InternalError(e.to_string()).into_parts()
        })?;

    info!(
        "Image analysed: deepfake={}, confidence={:.2}",
        verdict.is_deepfake, verdict.confidence
    );

    Ok(Json(AnalyzeResponse::from(verdict)))
}
