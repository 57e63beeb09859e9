// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP surface
//!
//! - `POST /analyze`: single image (data URI) for the browser extension
//! - `POST /v1/analyze-video`: multipart video upload
//! - `GET /health`, `GET /v1/models`: liveness and model availability

pub mod analyze;
pub mod analyze_video;
pub mod errors;
pub mod http_server;

pub use analyze::{analyze_handler, AnalyzeRequest, AnalyzeResponse};
pub use analyze_video::{analyze_video_handler, AnalyzeVideoResponse};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{create_app, start_server, AppState};
