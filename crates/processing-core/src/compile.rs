//! Crop filter compilation.
//!
//! Converts a smoothed crop path into a [`CropFilterSpec`]: a fixed-size crop
//! window whose left edge is either constant (low motion) or described by at
//! most `max_key_points` key points. The vertical offset is static at the
//! frame's vertical center.
//!
//! Every emitted offset is clamped to `[0, source - crop]`, so the crop window stays
//! inside the frame no matter what the estimates contained.

use reframe_common::config::ReframingSettings;
use reframe_model::{CropFilterSpec, CropPathPoint, CropRect, KeyPoint, TargetAspect, VideoInfo};

/// Compiler tuning.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Population variance of `x(t)` (pixels squared) below which the crop is static.
    pub low_motion_variance_px2: f64,

    /// Upper bound on key points in a dynamic spec (first and last always kept).
    pub max_key_points: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            low_motion_variance_px2: 100.0,
            max_key_points: 10,
        }
    }
}

impl From<&ReframingSettings> for CompilerConfig {
    fn from(settings: &ReframingSettings) -> Self {
        Self {
            low_motion_variance_px2: settings.low_motion_variance_px2,
            max_key_points: settings.max_key_points,
        }
    }
}

/// Compiles crop paths into crop filter specs.
#[derive(Debug, Clone, Default)]
pub struct CropFilterCompiler {
    config: CompilerConfig,
}

impl CropFilterCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Compile `path` for a `video`-sized source cropped to `aspect`.
    pub fn compile(
        &self,
        path: &[CropPathPoint],
        video: &VideoInfo,
        aspect: TargetAspect,
    ) -> CropFilterSpec {
        let crop = CropRect::fit(video.width, video.height, aspect);
        let max_x = crop.max_x(video.width);
        let y = crop.max_y(video.height) / 2;

        if path.is_empty() {
            return CropFilterSpec::Static {
                crop,
                x: max_x / 2,
                y,
            };
        }

        let xs = horizontal_trajectory(path, video.width, crop);
        let (mean, variance) = mean_and_variance(&xs);

        if variance < self.config.low_motion_variance_px2 {
            let x = to_offset(mean, max_x);
            tracing::debug!(variance, x, y, "Compiled static crop");
            return CropFilterSpec::Static { crop, x, y };
        }

        let key_points: Vec<KeyPoint> = downsample_indices(xs.len(), self.config.max_key_points)
            .into_iter()
            .map(|i| KeyPoint::new(path[i].time_secs, to_offset(xs[i], max_x)))
            .collect();

        tracing::debug!(
            variance,
            key_points = key_points.len(),
            y,
            "Compiled dynamic crop"
        );
        CropFilterSpec::Dynamic {
            crop,
            key_points,
            y,
        }
    }
}

/// Left edge of the crop window for every path point, clamped to the frame.
///
/// Non-finite centers are treated as the frame center.
pub fn horizontal_trajectory(path: &[CropPathPoint], width: u32, crop: CropRect) -> Vec<f64> {
    let max_x = crop.max_x(width) as f64;
    let half = crop.width as f64 / 2.0;
    path.iter()
        .map(|p| {
            let cx = if p.center_x.is_finite() { p.center_x } else { 0.5 };
            (cx * width as f64 - half).clamp(0.0, max_x)
        })
        .collect()
}

/// Evenly spaced indices into a sequence of `len` items, at most `max_points`
/// of them, always including the first and last.
pub fn downsample_indices(len: usize, max_points: usize) -> Vec<usize> {
    if len == 0 {
        return vec![];
    }
    let target = max_points.max(2);
    if len <= target {
        return (0..len).collect();
    }

    let last_idx = len - 1;
    (0..target)
        .map(|i| ((i as f64 / (target - 1) as f64) * last_idx as f64).round() as usize)
        .collect()
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

fn to_offset(x: f64, max_x: u32) -> u32 {
    (x.round().max(0.0) as u32).min(max_x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{segment, synthesize, PathSmoother};
    use proptest::prelude::*;
    use reframe_model::{ActionEstimate, EstimateSource};

    fn video(width: u32, height: u32, duration: f64) -> VideoInfo {
        VideoInfo::new(width, height, duration, 30.0).unwrap()
    }

    fn flat_path(cx: f64, frames: usize) -> Vec<CropPathPoint> {
        (0..frames)
            .map(|i| CropPathPoint::new(i as f64 / 30.0, cx, 0.5, 0.9))
            .collect()
    }

    #[test]
    fn test_centered_subject_gives_centered_static_crop() {
        let info = video(1920, 1080, 10.0);
        let spec = CropFilterCompiler::default().compile(
            &flat_path(0.5, 300),
            &info,
            TargetAspect::Portrait,
        );
        let CropFilterSpec::Static { crop, x, y } = spec else {
            panic!("expected static spec, got {spec:?}");
        };
        assert_eq!(crop, CropRect { width: 607, height: 1080 });
        let centered = (1920 - 607) as f64 / 2.0;
        assert!((x as f64 - centered).abs() <= 1.0);
        assert_eq!(y, 0);
    }

    #[test]
    fn test_portrait_crop_of_landscape_keeps_full_height() {
        let info = video(1920, 1080, 1.0);
        let spec = CropFilterCompiler::default().compile(&[], &info, TargetAspect::Portrait);
        let crop = spec.crop();
        assert_eq!(crop.height, 1080);
        assert_eq!(crop.width, (1080.0_f64 * 9.0 / 16.0).floor() as u32);
        assert_eq!(spec.x_at(0.0), ((1920 - crop.width) / 2) as f64);
    }

    #[test]
    fn test_right_edge_subject_clamps() {
        // 9:16 crop of a 1000x712 frame is 400px wide (40% of the width).
        let info = video(1000, 712, 5.0);
        let spec = CropFilterCompiler::default().compile(
            &flat_path(0.95, 150),
            &info,
            TargetAspect::Portrait,
        );
        assert_eq!(spec.crop().width, 400);
        assert_eq!(spec, CropFilterSpec::Static {
            crop: CropRect { width: 400, height: 712 },
            x: 600,
            y: 0,
        });
    }

    #[test]
    fn test_three_segment_sweep_is_dynamic() {
        let info = video(1920, 1080, 30.0);
        let estimates: Vec<_> = segment(30.0, 10.0)
            .unwrap()
            .into_iter()
            .zip([0.2, 0.5, 0.8])
            .map(|(seg, cx)| ActionEstimate::new(seg, cx, 0.5, 0.9, EstimateSource::Primary))
            .collect();
        let path = PathSmoother::default().smooth(&synthesize(&estimates, 30.0, 30.0));

        let spec = CropFilterCompiler::default().compile(&path, &info, TargetAspect::Portrait);
        let CropFilterSpec::Dynamic { key_points, y, .. } = &spec else {
            panic!("expected dynamic spec, got {spec:?}");
        };
        assert_eq!(key_points.len(), 10);
        assert_eq!(key_points[0].time_secs, 0.0);
        assert_eq!(key_points.last().unwrap().time_secs, path.last().unwrap().time_secs);
        assert_eq!(*y, 0);
        for pair in key_points.windows(2) {
            assert!(pair[1].time_secs > pair[0].time_secs);
            assert!(pair[1].x >= pair[0].x);
        }
    }

    #[test]
    fn test_non_finite_center_is_clamped_to_center() {
        let info = video(1920, 1080, 1.0);
        let mut path = flat_path(0.5, 30);
        path[3].center_x = f64::NAN;
        path[4].center_x = f64::INFINITY;
        let spec = CropFilterCompiler::default().compile(&path, &info, TargetAspect::Portrait);
        assert!(spec.is_static());
    }

    #[test]
    fn test_downsample_indices() {
        assert_eq!(downsample_indices(0, 10), Vec::<usize>::new());
        assert_eq!(downsample_indices(3, 10), vec![0, 1, 2]);
        assert_eq!(downsample_indices(11, 3), vec![0, 5, 10]);
        let idx = downsample_indices(900, 10);
        assert_eq!(idx.len(), 10);
        assert_eq!(idx[0], 0);
        assert_eq!(idx[9], 899);
    }

    #[test]
    fn test_threshold_from_settings() {
        let settings = ReframingSettings {
            low_motion_variance_px2: 1e12,
            ..ReframingSettings::default()
        };
        let compiler = CropFilterCompiler::new(CompilerConfig::from(&settings));
        let info = video(1920, 1080, 2.0);
        let path: Vec<_> = (0..60)
            .map(|i| CropPathPoint::new(i as f64 / 30.0, i as f64 / 60.0, 0.5, 0.9))
            .collect();
        assert!(compiler.compile(&path, &info, TargetAspect::Portrait).is_static());
    }

    proptest! {
        #[test]
        fn prop_offsets_stay_in_frame(
            width in 16u32..4000,
            height in 16u32..4000,
            aspect_idx in 0usize..4,
            xs in proptest::collection::vec(-2.0f64..3.0, 1..400),
            t in -1.0f64..30.0,
        ) {
            let info = VideoInfo::new(width, height, 20.0, 30.0).unwrap();
            let path: Vec<_> = xs
                .iter()
                .enumerate()
                .map(|(i, &x)| CropPathPoint::new(i as f64 / 30.0, x, 0.5, 0.9))
                .collect();
            let aspect = TargetAspect::ALL[aspect_idx];
            let spec = CropFilterCompiler::default().compile(&path, &info, aspect);
            let crop = spec.crop();

            prop_assert!(spec.x_at(t) >= 0.0);
            prop_assert!(spec.x_at(t) <= crop.max_x(width) as f64);
            prop_assert!(spec.y() <= crop.max_y(height));
            if let CropFilterSpec::Dynamic { key_points, .. } = &spec {
                prop_assert!(key_points.len() <= 10);
                for kp in key_points {
                    prop_assert!(kp.x <= crop.max_x(width));
                }
            }
        }

        #[test]
        fn prop_aspect_fidelity(
            width in 64u32..4000,
            height in 64u32..4000,
            aspect_idx in 0usize..4,
        ) {
            let aspect = TargetAspect::ALL[aspect_idx];
            let crop = CropRect::fit(width, height, aspect);
            let ratio = crop.width as f64 / crop.height as f64;
            let tolerance = 2.0 * aspect.ratio().max(1.0) / crop.width.min(crop.height) as f64;
            prop_assert!((ratio - aspect.ratio()).abs() <= tolerance);
        }

        #[test]
        fn prop_kind_is_deterministic(xs in proptest::collection::vec(0.0f64..=1.0, 1..200)) {
            let info = VideoInfo::new(1280, 720, 10.0, 30.0).unwrap();
            let path: Vec<_> = xs
                .iter()
                .enumerate()
                .map(|(i, &x)| CropPathPoint::new(i as f64 / 30.0, x, 0.5, 0.9))
                .collect();
            let compiler = CropFilterCompiler::default();
            let a = compiler.compile(&path, &info, TargetAspect::Portrait);
            let b = compiler.compile(&path, &info, TargetAspect::Portrait);
            prop_assert_eq!(a.kind(), b.kind());
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn test_aspect_fidelity_two_decimals_on_hd_source() {
        for aspect in [TargetAspect::Portrait, TargetAspect::Landscape, TargetAspect::Square] {
            let crop = CropRect::fit(1920, 1080, aspect);
            let ratio = crop.width as f64 / crop.height as f64;
            let round2 = |v: f64| (v * 100.0).round() / 100.0;
            assert_eq!(round2(ratio), round2(aspect.ratio()), "aspect {aspect}");
        }
    }
}
