// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, request, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{multipart::MultipartRejection, Multipart};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::analyze::{analyze_handler, AnalyzeRequest};
use super::analyze_video::analyze_video_handler;
use super::errors::error_json;
use crate::config::AppConfig;
use crate::version;
use crate::vision::{CheckpointInfo, DetectorModelInfo, DetectorModelManager};

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub model_manager: Arc<RwLock<Option<Arc<DetectorModelManager>>>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(model_manager: DetectorModelManager, config: AppConfig) -> Self {
        Self {
            model_manager: Arc::new(RwLock::new(Some(Arc::new(model_manager)))),
            config: Arc::new(config),
        }
    }

    /// State with default configuration and no models loaded
    pub fn new_for_test() -> Self {
        Self {
            model_manager: Arc::new(RwLock::new(None)),
            config: Arc::new(AppConfig::default()),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Current model manager, if one is installed
    pub async fn model_manager(&self) -> Option<Arc<DetectorModelManager>> {
        self.model_manager.read().await.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models: Vec<DetectorModelInfo>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<DetectorModelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<CheckpointInfo>,
}

/// Build the router with all routes and layers
pub fn create_app(state: AppState) -> Router {
    let max_upload = state.config.server.max_upload_bytes;
    let cors = cors_layer(&state.config.server.cors_origin_prefix);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/models", get(models_handler))
        .route("/analyze", post(analyze_handler_wrapper))
        .route("/v1/analyze-video", post(analyze_video_handler_wrapper))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Allow only origins starting with `prefix` (the browser extension)
fn cors_layer(prefix: &str) -> CorsLayer {
    let prefix = prefix.to_string();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request: &request::Parts| {
                origin.as_bytes().starts_with(prefix.as_bytes())
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = state.config.server.listen_addr.parse()?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Deepfake detector listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let models = state
        .model_manager()
        .await
        .map(|m| m.list_models())
        .unwrap_or_default();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: version::VERSION_NUMBER.to_string(),
        models,
    })
}

async fn models_handler(State(state): State<AppState>) -> impl IntoResponse {
    let manager = state.model_manager().await;
    Json(ModelsResponse {
        models: manager.as_ref().map(|m| m.list_models()).unwrap_or_default(),
        checkpoint: manager.as_ref().and_then(|m| m.checkpoint_info().cloned()),
    })
}

async fn analyze_handler_wrapper(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(request) => request,
        Err(rejection) => {
            tracing::warn!("Rejected analyze body: {}", rejection.body_text());
            return error_json(
                StatusCode::BAD_REQUEST,
                format!("Invalid request: {}", rejection.body_text()),
            );
        }
    };

    match analyze_handler(State(state), request).await {
        Ok(response) => (StatusCode::OK, response).into_response(),
        Err((status, message)) => error_json(status, message),
    }
}

async fn analyze_video_handler_wrapper(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::warn!("Rejected video upload: {}", rejection);
            return error_json(
                StatusCode::BAD_REQUEST,
                format!("Invalid request: {}", rejection),
            );
        }
    };

    match analyze_video_handler(State(state), headers, multipart).await {
        Ok(response) => (StatusCode::OK, response).into_response(),
        Err((status, message)) => error_json(status, message),
    }
}
