//! Crop-path synthesis.
//!
//! Expands sparse per-segment estimates into one [`CropPathPoint`] per output
//! frame. Each frame time resolves to one of four cases:
//!
//! 1. **Anchor:** inside a segment, the estimate is copied verbatim.
//! 2. **Gap:** between two segments, values are interpolated linearly and the
//!    confidence is `min(before, after) * INTERPOLATION_PENALTY`.
//! 3. **Edge:** only one side has an estimate, its value is held and the
//!    confidence is multiplied by `EXTRAPOLATION_PENALTY`.
//! 4. **Empty:** no estimates at all, the frame center is used.

use reframe_common::clock::{frame_count, frame_time};
use reframe_model::{ActionEstimate, CropPathPoint};

/// Confidence multiplier for values interpolated across a gap.
pub const INTERPOLATION_PENALTY: f64 = 0.8;

/// Confidence multiplier for values held past the first/last estimate.
pub const EXTRAPOLATION_PENALTY: f64 = 0.9;

/// Confidence used when there are no estimates to derive from.
pub const EMPTY_CONFIDENCE: f64 = 0.5;

/// Build the dense per-frame crop path.
///
/// Produces one point per frame at `t = i / frame_rate`, covering every frame
/// time in `[0, duration_secs)`. Estimates need not be sorted.
pub fn synthesize(
    estimates: &[ActionEstimate],
    duration_secs: f64,
    frame_rate: f64,
) -> Vec<CropPathPoint> {
    let frames = frame_count(duration_secs, frame_rate);

    let mut sorted: Vec<&ActionEstimate> = estimates.iter().collect();
    sorted.sort_by(|a, b| a.segment.start_secs.total_cmp(&b.segment.start_secs));

    let path: Vec<CropPathPoint> = (0..frames)
        .map(|i| point_at(&sorted, frame_time(i, frame_rate)))
        .collect();

    tracing::debug!(frames, estimates = estimates.len(), "Synthesized crop path");
    path
}

fn point_at(sorted: &[&ActionEstimate], t: f64) -> CropPathPoint {
    if sorted.is_empty() {
        return CropPathPoint::new(t, 0.5, 0.5, EMPTY_CONFIDENCE);
    }

    // First estimate starting after `t`; everything before it starts at or before `t`.
    let idx = sorted.partition_point(|e| e.segment.start_secs <= t);
    let before = idx.checked_sub(1).map(|i| sorted[i]);
    let after = sorted.get(idx).copied();

    match (before, after) {
        (Some(b), _) if b.segment.contains(t) => {
            CropPathPoint::new(t, b.center_x, b.center_y, b.confidence)
        }
        (Some(b), Some(a)) => {
            let gap = a.segment.start_secs - b.segment.end_secs;
            let frac = if gap > 0.0 {
                ((t - b.segment.end_secs) / gap).clamp(0.0, 1.0)
            } else {
                0.0
            };
            CropPathPoint::new(
                t,
                lerp(b.center_x, a.center_x, frac),
                lerp(b.center_y, a.center_y, frac),
                b.confidence.min(a.confidence) * INTERPOLATION_PENALTY,
            )
        }
        (Some(edge), None) | (None, Some(edge)) => CropPathPoint::new(
            t,
            edge.center_x,
            edge.center_y,
            edge.confidence * EXTRAPOLATION_PENALTY,
        ),
        (None, None) => CropPathPoint::new(t, 0.5, 0.5, EMPTY_CONFIDENCE),
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use reframe_model::{EstimateSource, Segment};

    fn est(start: f64, end: f64, cx: f64, conf: f64) -> ActionEstimate {
        ActionEstimate::new(Segment::new(start, end), cx, 0.5, conf, EstimateSource::Primary)
    }

    #[test]
    fn test_frame_count_and_times() {
        let path = synthesize(&[est(0.0, 2.0, 0.3, 0.9)], 2.0, 30.0);
        assert_eq!(path.len(), 60);
        assert_eq!(path[0].time_secs, 0.0);
        assert!((path[59].time_secs - 59.0 / 30.0).abs() < 1e-12);
        for pair in path.windows(2) {
            assert!(pair[1].time_secs > pair[0].time_secs);
        }
    }

    #[test]
    fn test_last_frame_stays_anchored_when_product_rounds_up() {
        // 2.2 * 25.0 lands just above 55 in f64.
        for (duration, frames) in [(2.2, 55), (4.4, 110)] {
            let path = synthesize(&[est(0.0, duration, 0.3, 0.9)], duration, 25.0);
            assert_eq!(path.len(), frames);
            let last = path.last().unwrap();
            assert!(last.time_secs < duration);
            assert_eq!(last.confidence, 0.9);
            assert_eq!(last.center_x, 0.3);
        }
    }

    #[test]
    fn test_anchor_copies_estimate() {
        let estimates = vec![est(0.0, 1.0, 0.2, 0.9), est(1.0, 2.0, 0.8, 0.6)];
        let path = synthesize(&estimates, 2.0, 10.0);
        assert!(path[..10].iter().all(|p| p.center_x == 0.2 && p.confidence == 0.9));
        assert!(path[10..].iter().all(|p| p.center_x == 0.8 && p.confidence == 0.6));
    }

    #[test]
    fn test_gap_interpolates_with_penalty() {
        // Gap [1.0, 2.0) between two segments.
        let estimates = vec![est(0.0, 1.0, 0.2, 0.9), est(2.0, 3.0, 0.6, 0.5)];
        let path = synthesize(&estimates, 3.0, 10.0);
        let mid = &path[15];
        assert!((mid.time_secs - 1.5).abs() < 1e-12);
        assert!((mid.center_x - 0.4).abs() < 1e-9);
        assert!((mid.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_edges_hold_with_penalty() {
        let estimates = vec![est(1.0, 2.0, 0.7, 0.8)];
        let path = synthesize(&estimates, 3.0, 10.0);
        let leading = &path[0];
        assert_eq!(leading.center_x, 0.7);
        assert!((leading.confidence - 0.72).abs() < 1e-9);
        let trailing = path.last().unwrap();
        assert_eq!(trailing.center_x, 0.7);
        assert!((trailing.confidence - 0.72).abs() < 1e-9);
    }

    #[test]
    fn test_empty_estimates_center() {
        let path = synthesize(&[], 1.0, 24.0);
        assert_eq!(path.len(), 24);
        assert!(path
            .iter()
            .all(|p| p.center_x == 0.5 && p.center_y == 0.5 && p.confidence == EMPTY_CONFIDENCE));
    }

    #[test]
    fn test_unsorted_estimates() {
        let estimates = vec![est(10.0, 20.0, 0.8, 0.9), est(0.0, 10.0, 0.2, 0.9)];
        let path = synthesize(&estimates, 20.0, 1.0);
        assert_eq!(path[0].center_x, 0.2);
        assert_eq!(path[15].center_x, 0.8);
    }

    #[test]
    fn test_step_function_for_three_segments() {
        let estimates = vec![
            est(0.0, 10.0, 0.2, 0.9),
            est(10.0, 20.0, 0.5, 0.9),
            est(20.0, 30.0, 0.8, 0.9),
        ];
        let path = synthesize(&estimates, 30.0, 30.0);
        assert_eq!(path.len(), 900);
        for pair in path.windows(2) {
            assert!(pair[1].center_x >= pair[0].center_x);
        }
    }

    proptest! {
        #[test]
        fn prop_confidence_never_exceeds_source(
            confs in proptest::collection::vec(0.0f64..=1.0, 1..6),
            gap in 0.0f64..2.0,
        ) {
            // Segments of length 1 separated by `gap`, video padded by 1s on each side.
            let estimates: Vec<_> = confs
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let start = 1.0 + i as f64 * (1.0 + gap);
                    est(start, start + 1.0, 0.5, c)
                })
                .collect();
            let duration = 2.0 + confs.len() as f64 * (1.0 + gap);
            let max_conf = confs.iter().cloned().fold(0.0, f64::max);

            let path = synthesize(&estimates, duration, 12.0);
            prop_assert_eq!(path.len(), frame_count(duration, 12.0));
            for p in &path {
                prop_assert!(p.confidence <= max_conf + 1e-12);
                prop_assert!(p.time_secs >= 0.0 && p.time_secs < duration);
            }
        }

        #[test]
        fn prop_single_segment_path_is_fully_anchored(
            millis in 1u32..60_000,
            fps in proptest::sample::select(vec![23.976, 24.0, 25.0, 29.97, 30.0, 50.0, 59.94, 60.0]),
        ) {
            let duration = f64::from(millis) / 1000.0;
            let path = synthesize(&[est(0.0, duration, 0.4, 0.7)], duration, fps);
            prop_assert!(!path.is_empty());
            prop_assert!(path.len() as f64 >= duration * fps - 1e-6);
            for p in &path {
                prop_assert!(p.time_secs >= 0.0 && p.time_secs < duration);
                prop_assert_eq!(p.confidence, 0.7);
            }
        }
    }
}
