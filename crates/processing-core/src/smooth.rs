//! Crop-path smoothing.
//!
//! Windowed weighted moving average over the dense path. Weights fall off as
//! `exp(-|offset| / 2)`. Points closer than `radius` to either end of the path
//! pass through untouched.

use reframe_model::CropPathPoint;

/// Default window half-width in frames.
pub const DEFAULT_RADIUS: usize = 5;

/// Jitter smoother for crop paths.
#[derive(Debug, Clone)]
pub struct PathSmoother {
    radius: usize,
    weights: Vec<f64>,
}

impl PathSmoother {
    /// Create a smoother with the given window half-width.
    pub fn new(radius: usize) -> Self {
        let weights = (0..=2 * radius)
            .map(|k| (-((k as f64 - radius as f64).abs()) / 2.0).exp())
            .collect();
        Self { radius, weights }
    }

    /// Smooth `center_x`/`center_y`; `time_secs` and `confidence` are kept.
    pub fn smooth(&self, path: &[CropPathPoint]) -> Vec<CropPathPoint> {
        let r = self.radius;
        if r == 0 || path.len() < 2 * r + 1 {
            return path.to_vec();
        }

        let weight_sum: f64 = self.weights.iter().sum();
        let mut result = path.to_vec();
        for i in r..path.len() - r {
            let center = path[i];
            let window = &path[i - r..=i + r];

            // Averaging offsets from the center keeps a flat window exactly flat.
            let (dx, dy) = window
                .iter()
                .zip(&self.weights)
                .fold((0.0, 0.0), |(dx, dy), (p, w)| {
                    (
                        dx + w * (p.center_x - center.center_x),
                        dy + w * (p.center_y - center.center_y),
                    )
                });

            result[i].center_x = center.center_x + dx / weight_sum;
            result[i].center_y = center.center_y + dy / weight_sum;
        }
        result
    }
}

impl Default for PathSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS)
    }
}
