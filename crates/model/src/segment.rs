//! Analysis windows over the video timeline.

use serde::{Deserialize, Serialize};

/// A half-open time interval `[start_secs, end_secs)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Inclusive start (seconds).
    pub start_secs: f64,
    /// Exclusive end (seconds).
    pub end_secs: f64,
    /// `end_secs - start_secs`.
    pub duration_secs: f64,
}

impl Segment {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        Self {
            start_secs,
            end_secs,
            duration_secs: end_secs - start_secs,
        }
    }

    /// Whether `t` falls inside the half-open interval.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_secs && t < self.end_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_open_containment() {
        let seg = Segment::new(10.0, 20.0);
        assert!(seg.contains(10.0));
        assert!(seg.contains(19.999));
        assert!(!seg.contains(20.0));
        assert!(!seg.contains(9.999));
        assert_eq!(seg.duration_secs, 10.0);
    }
}
