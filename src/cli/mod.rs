// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyze;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deepfake detector CLI
#[derive(Parser, Debug)]
#[command(name = "deepfake-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Analyse images and videos for deepfakes", long_about = None)]
pub struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, global = true, env = "DETECTOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a single image file
    AnalyzeImage(analyze::AnalyzeImageArgs),

    /// Classify a video file (mp4, avi, mov)
    AnalyzeVideo(analyze::AnalyzeVideoArgs),

    /// Validate a fusion checkpoint and print its fingerprint
    InspectCheckpoint(analyze::InspectCheckpointArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::AnalyzeImage(args) => analyze::analyze_image(config_path, args).await,
        Commands::AnalyzeVideo(args) => analyze::analyze_video(config_path, args).await,
        Commands::InspectCheckpoint(args) => analyze::inspect_checkpoint(args),
    }
}
