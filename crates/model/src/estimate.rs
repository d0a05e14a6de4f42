//! Per-segment subject-position estimates and analysis strategies.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// Strategy used to estimate the subject position of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    /// One composite frame per segment.
    Primary,
    /// Several representative frames per segment, averaged.
    Secondary,
    /// Primary first, secondary when confidence is low.
    #[default]
    Hybrid,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::Primary => "primary",
            AnalysisMethod::Secondary => "secondary",
            AnalysisMethod::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMethod {
    type Err = MethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(AnalysisMethod::Primary),
            "secondary" => Ok(AnalysisMethod::Secondary),
            "hybrid" => Ok(AnalysisMethod::Hybrid),
            _ => Err(MethodParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown analysis method: {0} (expected primary, secondary or hybrid)")]
pub struct MethodParseError(pub String);

/// Which path produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// Composite-frame request succeeded.
    Primary,
    /// Representative-frame requests succeeded.
    Secondary,
    /// Analysis failed; the configured default was substituted.
    Degraded,
}

/// Estimated subject position for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEstimate {
    /// Segment this estimate covers.
    pub segment: Segment,

    /// Normalized horizontal subject center (0 = left, 1 = right).
    pub center_x: f64,

    /// Normalized vertical subject center (0 = top, 1 = bottom).
    pub center_y: f64,

    /// Confidence in `[0, 1]`.
    pub confidence: f64,

    /// Free-form activity labels reported by the service.
    #[serde(default)]
    pub labels: BTreeSet<String>,

    /// How this estimate was obtained.
    pub source: EstimateSource,
}

impl ActionEstimate {
    pub fn new(
        segment: Segment,
        center_x: f64,
        center_y: f64,
        confidence: f64,
        source: EstimateSource,
    ) -> Self {
        Self {
            segment,
            center_x,
            center_y,
            confidence,
            labels: BTreeSet::new(),
            source,
        }
    }

    /// Placeholder estimate used when analysis fails.
    pub fn degraded(segment: Segment, center_x: f64, center_y: f64, confidence: f64) -> Self {
        Self::new(
            segment,
            center_x,
            center_y,
            confidence,
            EstimateSource::Degraded,
        )
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.source == EstimateSource::Degraded
    }
}
