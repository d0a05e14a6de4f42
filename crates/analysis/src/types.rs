//! Vision-service wire types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the submitted image represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisHint {
    /// A single representative frame; locate the main subject.
    Subject,
    /// A temporal blend of a whole segment; locate the motion region.
    Composite,
}

/// Request body for `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Path to the image on storage shared with the service.
    pub image_path: PathBuf,
    pub hint: AnalysisHint,
    /// Time range of the source video the image was taken from.
    pub start_time: f64,
    pub end_time: f64,
}

/// Response body for `POST /analyze`.
///
/// Fields are optional on the wire so that incomplete responses surface as
/// validation failures rather than decode errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
