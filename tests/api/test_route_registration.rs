// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route registration tests
//!
//! Every public route is wired into the router and answers with JSON.

use crate::common::*;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use deepfake_detector::api::{create_app, AppState};
use deepfake_detector::config::DetectorConfig;
use deepfake_detector::vision::{CheckpointInfo, DetectorModelManager};
use std::sync::Arc;
use tower::util::ServiceExt;

async fn loaded_state() -> AppState {
    let manager = DetectorModelManager::from_parts(
        Some(Arc::new(constant_detector(-1.0))),
        None,
        None,
        DetectorConfig::default(),
    )
    .with_checkpoint_info(CheckpointInfo {
        path: Some("./models/fusion/checkpoint.json".to_string()),
        epoch: Some(9),
        sha256: "0f".repeat(32),
    });
    let state = AppState::new_for_test();
    *state.model_manager.write().await = Some(Arc::new(manager));
    state
}

async fn json_response(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = create_app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Test 1: GET /health lists model availability
#[tokio::test]
async fn test_health_route() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = json_response(loaded_state().await, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let models = body["models"].as_array().unwrap();
    assert_eq!(models.len(), 3);
    assert_eq!(models[0]["available"], true);
    assert_eq!(models[1]["available"], false);
}

/// Test 2: GET /v1/models includes the checkpoint fingerprint
#[tokio::test]
async fn test_models_route() {
    let request = Request::get("/v1/models").body(Body::empty()).unwrap();
    let (status, body) = json_response(loaded_state().await, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checkpoint"]["epoch"], 9);
    assert_eq!(body["checkpoint"]["sha256"].as_str().unwrap().len(), 64);
}

/// Test 3: POST /analyze returns the extension's wire format
#[tokio::test]
async fn test_analyze_route() {
    let payload = serde_json::json!({ "image": tiny_png_data_uri() });
    let request = Request::post("/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body) = json_response(loaded_state().await, request).await;

    // sigmoid(-1.0) = 0.268941
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isDeepfake"], true);
    assert_eq!(body["confidence"], 73.11);
}

/// Test 4: Handler errors are wrapped as {"error": message}
#[tokio::test]
async fn test_analyze_error_body() {
    let request = Request::post("/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = json_response(loaded_state().await, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        serde_json::json!({"error": "Validation error for image: image is required"})
    );
}

/// Test 5: CORS preflight from the extension is allowed
#[tokio::test]
async fn test_cors_preflight_from_extension() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/analyze")
        .header(header::ORIGIN, "chrome-extension://abcdefghijklmnop")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = create_app(loaded_state().await)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "chrome-extension://abcdefghijklmnop"
    );
}

/// Test 6: Unknown routes are 404
#[tokio::test]
async fn test_unknown_route() {
    let request = Request::get("/v1/generate").body(Body::empty()).unwrap();
    let response = create_app(AppState::new_for_test())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
