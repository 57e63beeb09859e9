// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use deepfake_detector::{
    api::{start_server, AppState},
    config::AppConfig,
    vision::DetectorModelManager,
};
use std::{env, path::PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting deepfake detector...\n");
    println!("📦 BUILD VERSION: {}", deepfake_detector::version::VERSION);
    println!("📅 Build Date: {}", deepfake_detector::version::BUILD_DATE);
    println!();

    let config_path = env::var("DETECTOR_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    tracing::info!("Detector policy: {:?}", config.detector);

    println!("🧠 Loading detector models...");
    let manager = DetectorModelManager::new(&config.models, config.detector.clone()).await?;
    for model in manager.list_models() {
        let mark = if model.available { "✅" } else { "⚠️" };
        println!("   {} {} ({})", mark, model.name, model.model_type);
    }
    if let Some(checkpoint) = manager.checkpoint_info() {
        println!("   🔑 Fusion checkpoint sha256: {}", checkpoint.sha256);
    }
    println!();

    println!("🌐 Listening on http://{}", config.server.listen_addr);
    println!("   POST /analyze            single image (data URI)");
    println!("   POST /v1/analyze-video   multipart video upload");
    println!("   GET  /health, /v1/models");
    println!();

    start_server(AppState::new(manager, config)).await
}
