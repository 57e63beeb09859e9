// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Random-access frame reading
//!
//! Decoding is delegated to the `ffprobe`/`ffmpeg` binaries, which must be on
//! `PATH`.

use image::RgbImage;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

/// Accepted upload containers (by file extension)
pub const SUPPORTED_CONTAINERS: &[&str] = &["mp4", "avi", "mov"];

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Unsupported video container: {0} (expected mp4, avi or mov)")]
    UnsupportedContainer(String),

    #[error("Failed to open video: {0}")]
    OpenFailed(String),

    #[error("Video contains no frames")]
    NoFrames,

    #[error("Failed to decode frame {index}: {reason}")]
    FrameDecode { index: usize, reason: String },
}

/// Case-insensitive container check on the file extension
pub fn is_supported_container(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_CONTAINERS
                .iter()
                .any(|c| c.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// A decoded video that can be read frame by frame
pub trait FrameSource {
    /// Total number of frames in the stream
    fn frame_count(&self) -> usize;

    /// Decode one frame; `Ok(None)` when the index is past the end
    fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, VideoError>;
}

/// `FrameSource` backed by the ffmpeg command line tools
#[derive(Debug)]
pub struct FfmpegFrameSource {
    path: PathBuf,
    frame_count: usize,
}

impl FfmpegFrameSource {
    /// Probe a video file
    ///
    /// # Errors
    /// - `UnsupportedContainer` for extensions other than mp4/avi/mov
    /// - `OpenFailed` when ffprobe cannot read the stream
    /// - `NoFrames` for an empty video stream
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VideoError> {
        let path = path.as_ref();

        if !is_supported_container(path) {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            return Err(VideoError::UnsupportedContainer(ext));
        }

        if !path.exists() {
            return Err(VideoError::OpenFailed(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let frame_count = probe_frame_count(path)?;
        if frame_count == 0 {
            return Err(VideoError::NoFrames);
        }

        debug!("Opened {} ({} frames)", path.display(), frame_count);
        Ok(Self {
            path: path.to_path_buf(),
            frame_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FfmpegFrameSource {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn read_frame(&mut self, index: usize) -> Result<Option<RgbImage>, VideoError> {
        if index >= self.frame_count {
            return Ok(None);
        }

        let output = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.path)
            .args([
                "-vf",
                &format!("select=eq(n\\,{})", index),
                "-vsync",
                "0",
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-",
            ])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| VideoError::FrameDecode {
                index,
                reason: format!("failed to run ffmpeg: {}", e),
            })?;

        if !output.status.success() {
            return Err(VideoError::FrameDecode {
                index,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if output.stdout.is_empty() {
            warn!("ffmpeg produced no data for frame {}", index);
            return Ok(None);
        }

        let frame = image::load_from_memory_with_format(&output.stdout, image::ImageFormat::Png)
            .map_err(|e| VideoError::FrameDecode {
                index,
                reason: e.to_string(),
            })?;

        Ok(Some(frame.to_rgb8()))
    }
}

/// Count video frames with ffprobe
///
/// Uses the container's `nb_frames` when present and falls back to
/// decoding the stream with `-count_frames`.
fn probe_frame_count(path: &Path) -> Result<usize, VideoError> {
    if let Some(count) = run_ffprobe(path, "nb_frames", false)? {
        return Ok(count);
    }
    Ok(run_ffprobe(path, "nb_read_frames", true)?.unwrap_or(0))
}

fn run_ffprobe(path: &Path, entry: &str, count_frames: bool) -> Result<Option<usize>, VideoError> {
    let mut command = Command::new("ffprobe");
    command.args(["-v", "error", "-select_streams", "v:0"]);
    if count_frames {
        command.arg("-count_frames");
    }
    let output = command
        .args([
            "-show_entries",
            &format!("stream={}", entry),
            "-of",
            "default=nokey=1:noprint_wrappers=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| VideoError::OpenFailed(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(VideoError::OpenFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(parse_probe_output(&String::from_utf8_lossy(&output.stdout)))
}

/// First numeric line of ffprobe output; `N/A` and blanks give `None`
fn parse_probe_output(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse().ok())
}
