//! Supported target aspect ratios.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target aspect ratio of the reframed output.
///
/// The set is closed: any other ratio is rejected as an input error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetAspect {
    /// 9:16 portrait (shorts, reels, stories).
    #[default]
    Portrait,
    /// 16:9 landscape.
    Landscape,
    /// 1:1 square.
    Square,
    /// 4:3 classic.
    Classic,
}

impl TargetAspect {
    /// All supported ratios.
    pub const ALL: [TargetAspect; 4] = [
        TargetAspect::Portrait,
        TargetAspect::Landscape,
        TargetAspect::Square,
        TargetAspect::Classic,
    ];

    /// `(width, height)` terms of the ratio.
    pub fn terms(&self) -> (u32, u32) {
        match self {
            TargetAspect::Portrait => (9, 16),
            TargetAspect::Landscape => (16, 9),
            TargetAspect::Square => (1, 1),
            TargetAspect::Classic => (4, 3),
        }
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        let (w, h) = self.terms();
        w as f64 / h as f64
    }
}

impl fmt::Display for TargetAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.terms();
        write!(f, "{w}:{h}")
    }
}

impl FromStr for TargetAspect {
    type Err = AspectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| AspectParseError::InvalidFormat(s.to_string()))?;
        let w: u32 = w
            .trim()
            .parse()
            .map_err(|_| AspectParseError::InvalidFormat(s.to_string()))?;
        let h: u32 = h
            .trim()
            .parse()
            .map_err(|_| AspectParseError::InvalidFormat(s.to_string()))?;

        TargetAspect::ALL
            .into_iter()
            .find(|aspect| aspect.terms() == (w, h))
            .ok_or_else(|| AspectParseError::Unsupported(s.to_string()))
    }
}

impl TryFrom<String> for TargetAspect {
    type Error = AspectParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetAspect> for String {
    fn from(value: TargetAspect) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AspectParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Unsupported aspect ratio: {0} (supported: 9:16, 16:9, 1:1, 4:3)")]
    Unsupported(String),
}
