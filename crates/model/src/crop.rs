//! Compiled crop instructions.
//!
//! A [`CropFilterSpec`] is renderer-agnostic: it names pixel offsets of a
//! fixed-size [`CropRect`] inside the source frame, either constant for the
//! whole video or as a handful of key points linearly interpolated in time.

use serde::{Deserialize, Serialize};

use crate::aspect::TargetAspect;

/// Size of the crop window in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Largest window of the target aspect that fits inside `width x height`.
    ///
    /// Sources wider than the target keep full height; narrower or equal
    /// sources keep full width.
    pub fn fit(width: u32, height: u32, aspect: TargetAspect) -> Self {
        let r = aspect.ratio();
        let (w, h) = (width as f64, height as f64);
        let (cw, ch) = if h > 0.0 && w / h > r {
            ((h * r).floor() as u32, height)
        } else {
            (width, (w / r).floor() as u32)
        };
        Self {
            width: cw.clamp(1, width.max(1)),
            height: ch.clamp(1, height.max(1)),
        }
    }

    /// Horizontal travel available to the window.
    pub fn max_x(&self, source_width: u32) -> u32 {
        source_width.saturating_sub(self.width)
    }

    /// Vertical travel available to the window.
    pub fn max_y(&self, source_height: u32) -> u32 {
        source_height.saturating_sub(self.height)
    }
}

/// Horizontal offset at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    /// Timestamp (seconds).
    pub time_secs: f64,
    /// Left edge of the crop window (pixels).
    pub x: u32,
}

impl KeyPoint {
    pub fn new(time_secs: f64, x: u32) -> Self {
        Self { time_secs, x }
    }
}

/// Renderer-agnostic crop instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CropFilterSpec {
    /// Constant offsets for the whole video.
    Static { crop: CropRect, x: u32, y: u32 },
    /// Horizontal offset interpolated linearly between key points; `y` is fixed.
    Dynamic {
        crop: CropRect,
        key_points: Vec<KeyPoint>,
        y: u32,
    },
}

impl CropFilterSpec {
    pub fn crop(&self) -> CropRect {
        match self {
            CropFilterSpec::Static { crop, .. } | CropFilterSpec::Dynamic { crop, .. } => *crop,
        }
    }

    pub fn y(&self) -> u32 {
        match self {
            CropFilterSpec::Static { y, .. } | CropFilterSpec::Dynamic { y, .. } => *y,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, CropFilterSpec::Static { .. })
    }

    /// `"static"` or `"dynamic"`.
    pub fn kind(&self) -> &'static str {
        match self {
            CropFilterSpec::Static { .. } => "static",
            CropFilterSpec::Dynamic { .. } => "dynamic",
        }
    }

    /// Horizontal offset at time `t`.
    ///
    /// Dynamic specs interpolate linearly between neighbouring key points and
    /// hold the first/last value outside their span.
    pub fn x_at(&self, t: f64) -> f64 {
        match self {
            CropFilterSpec::Static { x, .. } => *x as f64,
            CropFilterSpec::Dynamic { key_points, .. } => {
                let (Some(first), Some(last)) = (key_points.first(), key_points.last()) else {
                    return 0.0;
                };
                if t <= first.time_secs {
                    return first.x as f64;
                }
                if t >= last.time_secs {
                    return last.x as f64;
                }
                for pair in key_points.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    if t < b.time_secs {
                        let span = b.time_secs - a.time_secs;
                        if span <= 0.0 {
                            return b.x as f64;
                        }
                        let frac = (t - a.time_secs) / span;
                        return a.x as f64 + (b.x as f64 - a.x as f64) * frac;
                    }
                }
                last.x as f64
            }
        }
    }
}
