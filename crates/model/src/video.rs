//! Source video properties.

use serde::{Deserialize, Serialize};

/// Properties of the source video, fetched once per job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Frames per second.
    pub frame_rate: f64,
}

impl VideoInfo {
    /// Create video info, rejecting values no stage can work with.
    pub fn new(
        width: u32,
        height: u32,
        duration_secs: f64,
        frame_rate: f64,
    ) -> Result<Self, VideoInfoError> {
        if width == 0 || height == 0 {
            return Err(VideoInfoError::ZeroDimension { width, height });
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(VideoInfoError::NonPositiveDuration(duration_secs));
        }
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(VideoInfoError::NonPositiveFrameRate(frame_rate));
        }
        Ok(Self {
            width,
            height,
            duration_secs,
            frame_rate,
        })
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Number of frames in the dense crop path: `ceil(duration * fps)`.
    /// Frames with a presentation time inside `[0, duration)`.
    pub fn frame_count(&self) -> usize {
        let time = |i: usize| i as f64 / self.frame_rate;
        let mut count = (self.duration_secs * self.frame_rate).ceil() as usize;
        while count > 0 && time(count - 1) >= self.duration_secs {
            count -= 1;
        }
        while time(count) < self.duration_secs {
            count += 1;
        }
        count
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VideoInfoError {
    #[error("Video dimensions cannot be zero ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },
    #[error("Video duration must be positive, got {0}")]
    NonPositiveDuration(f64),
    #[error("Frame rate must be positive, got {0}")]
    NonPositiveFrameRate(f64),
}
