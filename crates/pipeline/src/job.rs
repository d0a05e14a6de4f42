//! Reframing job request and response types.

use std::path::{Path, PathBuf};

use reframe_analysis::AnalysisOutcome;
use reframe_common::error::{ReframeError, ReframeResult};
use reframe_model::{ActionEstimate, AnalysisMethod, CropFilterSpec, TargetAspect};
use serde::{Deserialize, Serialize};

/// A reframing request.
#[derive(Debug, Clone)]
pub struct ReframeRequest {
    pub input: PathBuf,

    /// Destination file. Defaults to `<stem>_<W>x<H>.mp4` beside the input.
    pub output: Option<PathBuf>,

    pub aspect: TargetAspect,
    pub method: AnalysisMethod,

    /// Overrides the configured maximum segment length (seconds).
    pub max_segment_duration_secs: Option<f64>,
}

impl ReframeRequest {
    pub fn new(input: impl Into<PathBuf>, aspect: TargetAspect) -> Self {
        Self {
            input: input.into(),
            output: None,
            aspect,
            method: AnalysisMethod::default(),
            max_segment_duration_secs: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_method(mut self, method: AnalysisMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_max_segment_duration(mut self, secs: f64) -> Self {
        self.max_segment_duration_secs = Some(secs);
        self
    }

    /// Where the rendered file will be written.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => default_output_path(&self.input, self.aspect),
        }
    }
}

fn default_output_path(input: &Path, aspect: TargetAspect) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let (w, h) = aspect.terms();
    input.with_file_name(format!("{stem}_{w}x{h}.mp4"))
}

/// Parse a `W:H` target ratio, rejecting anything outside the supported set.
pub fn parse_aspect(ratio: &str) -> ReframeResult<TargetAspect> {
    ratio.parse().map_err(|_| ReframeError::UnsupportedAspect {
        ratio: ratio.trim().to_string(),
    })
}

/// Summary numbers for a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub segment_count: usize,
    pub average_confidence: f64,
    pub degraded_segments: usize,
    /// Segments where hybrid mode fell back to the secondary method.
    pub fallback_segments: usize,
    pub path_frames: usize,
    /// `"static"` or `"dynamic"`, once compiled.
    pub crop_kind: Option<String>,
}

impl ProcessingStats {
    pub fn from_outcomes(outcomes: &[AnalysisOutcome]) -> Self {
        let segment_count = outcomes.len();
        let average_confidence = if segment_count == 0 {
            0.0
        } else {
            outcomes.iter().map(|o| o.estimate.confidence).sum::<f64>() / segment_count as f64
        };
        Self {
            segment_count,
            average_confidence,
            degraded_segments: outcomes.iter().filter(|o| o.estimate.is_degraded()).count(),
            fallback_segments: outcomes.iter().filter(|o| o.fallback_triggered).count(),
            path_frames: 0,
            crop_kind: None,
        }
    }
}

/// Result of [`ReframePipeline::reframe`](crate::ReframePipeline::reframe).
///
/// `segments` is populated whether or not rendering succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReframeResponse {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub segments: Vec<ActionEstimate>,
    pub processing_time_ms: u64,
    pub analysis_method: AnalysisMethod,
    pub crop_filter: Option<CropFilterSpec>,
    pub error: Option<String>,
    pub stats: ProcessingStats,
}
