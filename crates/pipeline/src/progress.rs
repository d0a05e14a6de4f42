//! Job progress reporting.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Receives job progress as a percentage in `[0, 100]`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Stage boundaries (percent).
pub const PROBE_DONE: f64 = 5.0;
pub const ANALYSIS_DONE: f64 = 60.0;
pub const COMPILE_DONE: f64 = 65.0;
pub const RENDER_DONE: f64 = 100.0;

/// Ceiling for renderer-reported progress. Only a persisted output reaches
/// [`RENDER_DONE`].
pub const RENDER_CEILING: f64 = 99.0;

/// Forwards progress to a callback, dropping anything that would move
/// backwards.
pub struct ProgressTracker {
    callback: Option<ProgressFn>,
    // Hundredths of a percent plus one; zero until the first report.
    reported: AtomicU32,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressFn>) -> Self {
        Self {
            callback,
            reported: AtomicU32::new(0),
        }
    }

    /// Report `percent`; ignored unless it exceeds what was already reported.
    pub fn report(&self, percent: f64) {
        let Some(callback) = &self.callback else {
            return;
        };
        if !percent.is_finite() {
            return;
        }
        let percent = percent.clamp(0.0, RENDER_DONE);
        let scaled = (percent * 100.0).round() as u32 + 1;
        let previous = self.reported.fetch_max(scaled, Ordering::SeqCst);
        if scaled > previous {
            callback(percent);
        }
    }

    /// Report a fraction of the span between two stage boundaries.
    pub fn report_span(&self, from: f64, to: f64, fraction: f64) {
        self.report(from + (to - from) * fraction.clamp(0.0, 1.0));
    }

    /// Last reported percentage.
    pub fn current(&self) -> f64 {
        self.reported.load(Ordering::SeqCst).saturating_sub(1) as f64 / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (ProgressTracker, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let tracker = ProgressTracker::new(Some(Arc::new(move |p| sink.lock().unwrap().push(p))));
        (tracker, seen)
    }

    #[test]
    fn test_progress_is_monotone() {
        let (tracker, seen) = recording();
        tracker.report(0.0);
        tracker.report(10.0);
        tracker.report(7.0);
        tracker.report(10.0);
        tracker.report(150.0);
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 10.0, 100.0]);
        assert_eq!(tracker.current(), 100.0);
    }

    #[test]
    fn test_repeated_start_fires_once() {
        let (tracker, seen) = recording();
        tracker.report(0.0);
        tracker.report(0.0);
        tracker.report(-3.0);
        tracker.report(0.004);
        assert_eq!(*seen.lock().unwrap(), vec![0.0]);
        assert_eq!(tracker.current(), 0.0);
    }

    #[test]
    fn test_render_span_stops_below_done() {
        let (tracker, seen) = recording();
        tracker.report_span(COMPILE_DONE, RENDER_CEILING, 1.0);
        assert_eq!(tracker.current(), RENDER_CEILING);
        tracker.report(RENDER_DONE);
        assert_eq!(*seen.lock().unwrap(), vec![RENDER_CEILING, RENDER_DONE]);
    }

    #[test]
    fn test_report_span() {
        let (tracker, seen) = recording();
        tracker.report_span(ANALYSIS_DONE, COMPILE_DONE, 0.5);
        tracker.report_span(COMPILE_DONE, RENDER_DONE, 2.0);
        assert_eq!(*seen.lock().unwrap(), vec![62.5, 100.0]);
    }

    #[test]
    fn test_without_callback_is_noop() {
        let tracker = ProgressTracker::new(None);
        tracker.report(50.0);
        assert_eq!(tracker.current(), 0.0);
    }
}
