// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Video analysis endpoint handler

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::Multipart;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::response::AnalyzeVideoResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::video::{is_supported_container, VideoAnalysis, VideoError};

/// Multipart field carrying the upload
pub const VIDEO_FIELD: &str = "video";

/// POST /v1/analyze-video - Classify an uploaded video
///
/// # Request
/// Multipart form with a `video` file field (mp4, avi or mov).
///
/// # Response
/// - `verdict`: `no_face_detected`, `real` or `fake`
/// - `message`: User-facing sentence
/// - `realCount`, `fakeCount`, `meanProbability`: vote details
/// - `cropsAnalyzed`, `framesSampled`
///
/// # Errors
/// - 400 Bad Request: Missing field, unsupported container, undecodable video
/// - 413 Payload Too Large: Upload over the configured limit
/// - 503 Service Unavailable: Face detector or frame classifier not loaded
/// - 500 Internal Server Error: Inference failed
pub async fn analyze_video_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeVideoResponse>, (StatusCode, String)> {
    let limit = state.config.server.max_upload_bytes;

    // 1. Reject oversized uploads before reading the body
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(ApiError::PayloadTooLarge { limit }.into_parts());
    }

    // 2. Get the pipeline
    let manager = state.model_manager().await.ok_or_else(|| {
        warn!("Detector models not available");
        ApiError::ServiceUnavailable("Detector models not loaded".to_string()).into_parts()
    })?;
    let pipeline = manager.video_pipeline().ok_or_else(|| {
        warn!("Video pipeline not loaded");
        ApiError::ServiceUnavailable("Video models not loaded".to_string()).into_parts()
    })?;

    // 3. Find the video field
    let (file_name, bytes) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| {
                warn!("Multipart field error: {}", e);
                ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)).into_parts()
            })?
            .ok_or_else(|| {
                ApiError::ValidationError {
                    field: VIDEO_FIELD.to_string(),
                    message: "video is required".to_string(),
                }
                .into_parts()
            })?;

        if field.name() != Some(VIDEO_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| {
            warn!("Failed to read video upload: {}", e);
            ApiError::InvalidRequest(format!("Failed to read upload: {}", e)).into_parts()
        })?;
        break (file_name, bytes);
    };

    if bytes.is_empty() {
        return Err(ApiError::ValidationError {
            field: VIDEO_FIELD.to_string(),
            message: "video is empty".to_string(),
        }
        .into_parts());
    }
    if bytes.len() > limit {
        return Err(ApiError::PayloadTooLarge { limit }.into_parts());
    }

    // 4. Check the container
    let extension = Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !is_supported_container(Path::new(&file_name)) {
        let err = VideoError::UnsupportedContainer(extension);
        warn!("Rejected upload '{}': {}", file_name, err);
        return Err(ApiError::InvalidRequest(err.to_string()).into_parts());
    }

    info!("Received video '{}' ({} bytes)", file_name, bytes.len());

    // 5. Spool to disk and analyse off the async runtime
    let analysis = tokio::task::spawn_blocking(move || -> anyhow::Result<VideoAnalysis> {
        let mut upload = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&format!(".{}", extension))
            .tempfile()?;
        upload.write_all(&bytes)?;
        upload.flush()?;
        pipeline.analyze_path(upload.path())
    })
    .await
    .map_err(|e| {
        error!("Video analysis task failed: {}", e);
        ApiError::InternalError(e.to_string()).into_parts()
    })?
    .map_err(|e| match e.downcast_ref::<VideoError>() {
        Some(video_error) => {
            warn!("Video rejected: {}", video_error);
            ApiError::InvalidRequest(video_error.to_string()).into_parts()
        }
        None => {
            error!("Video analysis failed: {:#}", e);
            ApiError::InternalError(e.to_string()).into_parts()
        }
    })?;

    Ok(Json(AnalyzeVideoResponse::from(analysis)))
}
