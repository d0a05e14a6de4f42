//! Timeline segmentation.
//!
//! Splits `[0, duration)` into consecutive half-open windows no longer than
//! the configured maximum. Boundaries are computed as `i * max` so that
//! neighbouring segments share the exact same float value and the last
//! segment ends exactly at `duration`.

use reframe_common::{ReframeError, ReframeResult};
use reframe_model::Segment;

/// Split `[0, duration_secs)` into ordered, contiguous segments.
pub fn segment(duration_secs: f64, max_segment_secs: f64) -> ReframeResult<Vec<Segment>> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(ReframeError::invalid_input(format!(
            "video duration must be positive, got {duration_secs}"
        )));
    }
    if !max_segment_secs.is_finite() || max_segment_secs <= 0.0 {
        return Err(ReframeError::invalid_input(format!(
            "max segment duration must be positive, got {max_segment_secs}"
        )));
    }

    let mut segments = Vec::with_capacity((duration_secs / max_segment_secs).ceil() as usize);
    let mut index = 0usize;
    loop {
        let start = index as f64 * max_segment_secs;
        if start >= duration_secs {
            break;
        }
        let end = ((index + 1) as f64 * max_segment_secs).min(duration_secs);
        segments.push(Segment::new(start, end));
        index += 1;
    }

    tracing::debug!(
        duration_secs,
        max_segment_secs,
        count = segments.len(),
        "Segmented timeline"
    );
    Ok(segments)
}
