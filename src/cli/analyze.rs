// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::AppConfig;
use crate::detection::{FusionCheckpoint, FREQNET_DIM};
use crate::vision::{decode_image_bytes, DetectorModelManager};

/// Arguments for analyze-image command
#[derive(Args, Debug)]
pub struct AnalyzeImageArgs {
    /// Image file (png, jpeg, webp, gif, bmp)
    pub path: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for analyze-video command
#[derive(Args, Debug)]
pub struct AnalyzeVideoArgs {
    /// Video file (mp4, avi, mov)
    pub path: PathBuf,

    /// Number of frames to sample
    #[arg(long)]
    pub samples: Option<usize>,

    /// Face box enlargement factor
    #[arg(long)]
    pub box_scaling: Option<f32>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for inspect-checkpoint command
#[derive(Args, Debug)]
pub struct InspectCheckpointArgs {
    /// Checkpoint JSON file
    pub path: PathBuf,
}

fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    dotenv::dotenv().ok();
    AppConfig::load(config_path)
}

/// Run the single-image pipeline on a file
pub async fn analyze_image(config_path: Option<&Path>, args: AnalyzeImageArgs) -> Result<()> {
    let config = load_config(config_path)?;

    let bytes = std::fs::read(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let (image, image_info) = decode_image_bytes(&bytes)?;
    info!(
        "Loaded {} ({}x{})",
        args.path.display(),
        image_info.width,
        image_info.height
    );

    let manager = DetectorModelManager::new(&config.models, config.detector.clone()).await?;
    let detector = manager.get_hybrid_detector().ok_or_else(|| {
        anyhow!("Image detector not available; check FREQNET_MODEL_PATH, CLIP_MODEL_PATH and FUSION_CHECKPOINT_PATH")
    })?;

    let verdict = detector.analyze_image(&image, config.detector.decision_threshold)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        let label = if verdict.is_deepfake { "DEEPFAKE" } else { "REAL" };
        println!("{}: {} ({:.2}% confidence)", args.path.display(), label, verdict.confidence);
    }
    Ok(())
}

/// Run the video pipeline on a file
pub async fn analyze_video(config_path: Option<&Path>, args: AnalyzeVideoArgs) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(samples) = args.samples {
        config.detector.sample_count = samples;
    }
    if let Some(scaling) = args.box_scaling {
        config.detector.box_scaling = scaling;
    }
    config.validate()?;

    let manager = DetectorModelManager::new(&config.models, config.detector.clone()).await?;
    let pipeline = manager.video_pipeline().ok_or_else(|| {
        anyhow!("Video pipeline not available; check FACE_DETECTOR_MODEL_PATH and FRAME_CLASSIFIER_MODEL_PATH")
    })?;

    let path = args.path.clone();
    let analysis = tokio::task::spawn_blocking(move || pipeline.analyze_path(&path)).await??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}", analysis.message);
        println!(
            "  frames sampled: {}, faces analysed: {}, real votes: {}, fake votes: {}",
            analysis.frames_sampled,
            analysis.crops_analyzed,
            analysis.real_count,
            analysis.fake_count
        );
        if let Some(mean) = analysis.mean_probability {
            println!("  mean real probability: {:.4}", mean);
        }
    }
    Ok(())
}

/// Validate a checkpoint and print a summary
pub fn inspect_checkpoint(args: InspectCheckpointArgs) -> Result<()> {
    let checkpoint = FusionCheckpoint::load(&args.path)?;
    let weight = checkpoint.head.weight();
    let norm = |w: &[f32]| w.iter().map(|x| x * x).sum::<f32>().sqrt();

    println!("checkpoint: {}", args.path.display());
    println!("sha256:     {}", checkpoint.sha256);
    match checkpoint.epoch {
        Some(epoch) => println!("epoch:      {}", epoch),
        None => println!("epoch:      unknown"),
    }
    println!("bias:       {:.6}", checkpoint.head.bias());
    println!("|w_freqnet|: {:.6}", norm(&weight[..FREQNET_DIM]));
    println!("|w_clip|:    {:.6}", norm(&weight[FREQNET_DIM..]));
    Ok(())
}
