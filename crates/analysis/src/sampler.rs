//! Representative-frame extraction.
//!
//! The analyzer never decodes video itself; it asks a [`FrameSampler`] to
//! write JPEGs into the job's temporary directory and hands their paths to
//! the vision service.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use reframe_model::Segment;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};

/// Writes analysis images for a source video.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// Write a single image blending the whole segment to `output`.
    async fn composite_frame(
        &self,
        input: &Path,
        segment: &Segment,
        output: &Path,
    ) -> AnalysisResult<()>;

    /// Write the frame at `time_secs` to `output`.
    async fn frame_at(&self, input: &Path, time_secs: f64, output: &Path) -> AnalysisResult<()>;
}

/// ffmpeg-backed [`FrameSampler`].
#[derive(Debug, Clone)]
pub struct FfmpegFrameSampler {
    ffmpeg: PathBuf,
    /// Frames blended into one composite.
    composite_frames: u32,
    /// Output width; height keeps the source aspect.
    scale_width: u32,
}

impl Default for FfmpegFrameSampler {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            composite_frames: 8,
            scale_width: 640,
        }
    }
}

impl FfmpegFrameSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    /// Arguments for a composite of `segment`: evenly spaced frames blended with `tmix`.
    pub fn composite_args(&self, input: &Path, segment: &Segment, output: &Path) -> Vec<String> {
        let frames = self.composite_frames.max(1);
        let duration = segment.duration_secs.max(0.001);
        let rate = frames as f64 / duration;
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", segment.start_secs),
            "-t".to_string(),
            format!("{duration:.3}"),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!(
                "fps={rate:.6},scale={}:-2,tmix=frames={frames}",
                self.scale_width
            ),
            "-update".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "3".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Arguments for a single frame at `time_secs`.
    pub fn frame_args(&self, input: &Path, time_secs: f64, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            format!("{time_secs:.3}"),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-vf".to_string(),
            format!("scale={}:-2", self.scale_width),
            "-q:v".to_string(),
            "3".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    async fn run(&self, args: Vec<String>, output: &Path) -> AnalysisResult<()> {
        debug!("Running ffmpeg {}", args.join(" "));
        let result = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AnalysisError::FrameExtraction(format!("failed to run ffmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(AnalysisError::FrameExtraction(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        if !output.exists() {
            return Err(AnalysisError::FrameExtraction(format!(
                "ffmpeg produced no image at {}",
                output.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    async fn composite_frame(
        &self,
        input: &Path,
        segment: &Segment,
        output: &Path,
    ) -> AnalysisResult<()> {
        self.run(self.composite_args(input, segment, output), output)
            .await
    }

    async fn frame_at(&self, input: &Path, time_secs: f64, output: &Path) -> AnalysisResult<()> {
        self.run(self.frame_args(input, time_secs, output), output)
            .await
    }
}
