//! Dense per-frame crop trajectory.

use serde::{Deserialize, Serialize};

/// Desired crop center at one output frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropPathPoint {
    /// Frame timestamp (seconds).
    pub time_secs: f64,
    /// Normalized horizontal center.
    pub center_x: f64,
    /// Normalized vertical center.
    pub center_y: f64,
    /// Confidence carried over from the estimate(s) it was derived from.
    pub confidence: f64,
}

impl CropPathPoint {
    pub fn new(time_secs: f64, center_x: f64, center_y: f64, confidence: f64) -> Self {
        Self {
            time_secs,
            center_x,
            center_y,
            confidence,
        }
    }
}
