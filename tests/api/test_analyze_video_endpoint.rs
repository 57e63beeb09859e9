// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Video endpoint tests for POST /v1/analyze-video
//!
//! Drives the full router with hand-built multipart bodies.

use crate::common::*;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use deepfake_detector::api::{create_app, AppState};
use deepfake_detector::config::{AppConfig, DetectorConfig};
use deepfake_detector::vision::DetectorModelManager;
use std::sync::Arc;
use tower::util::ServiceExt;

const BOUNDARY: &str = "deepfake-test-boundary";

fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        b = BOUNDARY,
        f = field,
        n = file_name
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::post("/v1/analyze-video")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

/// Helper: state with mock video models (never reached by these tests' inputs)
async fn state_with_video_models(config: AppConfig) -> AppState {
    let manager = DetectorModelManager::from_parts(
        None,
        Some(Arc::new(ScriptedClassifier::constant(0.9))),
        Some(Arc::new(MockDetector::new())),
        DetectorConfig::default(),
    );
    let state = AppState::new_for_test().with_config(config);
    *state.model_manager.write().await = Some(Arc::new(manager));
    state
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = create_app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Test 1: Without video models the endpoint is unavailable
#[tokio::test]
async fn test_no_video_models() {
    let (status, body) = send(
        AppState::new_for_test(),
        upload(multipart_body("video", "clip.mp4", b"data")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

/// Test 2: Unsupported containers are a 400
#[tokio::test]
async fn test_unsupported_container() {
    let state = state_with_video_models(AppConfig::default()).await;
    let (status, body) = send(state, upload(multipart_body("video", "clip.mkv", b"data"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("mkv"));
}

/// Test 3: A form without the video field is a 400
#[tokio::test]
async fn test_missing_video_field() {
    let state = state_with_video_models(AppConfig::default()).await;
    let (status, body) = send(state, upload(multipart_body("file", "clip.mp4", b"data"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("video is required"));
}

/// Test 4: An empty upload is a 400
#[tokio::test]
async fn test_empty_upload() {
    let state = state_with_video_models(AppConfig::default()).await;
    let (status, _) = send(state, upload(multipart_body("video", "clip.mp4", b""))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Test 5: A file that is not a video is a client error, not a 500
#[tokio::test]
async fn test_undecodable_video() {
    let state = state_with_video_models(AppConfig::default()).await;
    let (status, body) = send(
        state,
        upload(multipart_body("video", "clip.mp4", b"definitely not an mp4")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

/// Test 6: Uploads over the configured limit are a 413
#[tokio::test]
async fn test_upload_too_large() {
    let mut config = AppConfig::default();
    config.server.max_upload_bytes = 64;
    let state = state_with_video_models(config).await;

    let (status, _) = send(
        state,
        upload(multipart_body("video", "clip.mp4", &[0u8; 256])),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

/// Test 7: A non-multipart request is a 400
#[tokio::test]
async fn test_not_multipart() {
    let state = state_with_video_models(AppConfig::default()).await;
    let request = Request::post("/v1/analyze-video")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(state, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
