//! Job timing utilities.
//!
//! Every reframing job is anchored to a monotonic start instant so the
//! response can report `processing_time_ms` independent of wall-clock jumps.

use std::time::Instant;

/// A clock started when a reframing job begins.
#[derive(Debug, Clone)]
pub struct JobClock {
    /// The instant the job started.
    epoch: Instant,

    /// Wall-clock time at start (RFC 3339 string).
    started_at: String,
}

impl JobClock {
    /// Create a new job clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Milliseconds elapsed since the job started.
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Wall-clock time at job start.
    pub fn started_at(&self) -> &str {
        &self.started_at
    }
}

/// Number of output frames for a clip: `ceil(duration * fps)`.
///
/// The product is corrected for floating-point error so that exactly the
/// frames with `frame_time(i, fps) < duration` are counted (2.2 s at 25 fps
/// is 55 frames, not 56). Returns 0 for non-positive or non-finite inputs.
pub fn frame_count(duration_secs: f64, fps: f64) -> usize {
    if !duration_secs.is_finite() || !fps.is_finite() || duration_secs <= 0.0 || fps <= 0.0 {
        return 0;
    }
    let mut count = (duration_secs * fps).ceil() as usize;
    while count > 0 && frame_time(count - 1, fps) >= duration_secs {
        count -= 1;
    }
    while frame_time(count, fps) < duration_secs {
        count += 1;
    }
    count
}

/// Presentation time of frame `index` at `fps`.
pub fn frame_time(index: usize, fps: f64) -> f64 {
    index as f64 / fps
}
