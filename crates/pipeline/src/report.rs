//! JSON analysis report.

use std::path::{Path, PathBuf};

use reframe_common::error::ReframeResult;
use reframe_model::{ActionEstimate, AnalysisMethod, CropFilterSpec, CropRect, TargetAspect};
use serde::{Deserialize, Serialize};

use crate::job::ProcessingStats;
use crate::pipeline::ReframePlan;

/// Everything the pipeline decided for one input, minus the rendered file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub input: PathBuf,
    /// When the job started probing (RFC 3339).
    pub started_at: String,
    pub generated_at: String,
    pub target_aspect: TargetAspect,
    pub analysis_method: AnalysisMethod,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub duration_secs: f64,
    pub crop: CropRect,
    pub segments: Vec<ActionEstimate>,
    pub crop_filter: CropFilterSpec,
    pub stats: ProcessingStats,
}

impl AnalysisReport {
    pub fn from_plan(input: &Path, plan: &ReframePlan) -> Self {
        Self {
            input: input.to_path_buf(),
            started_at: plan.clock.started_at().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            target_aspect: plan.aspect,
            analysis_method: plan.method,
            width: plan.video.width,
            height: plan.video.height,
            frame_rate: plan.video.frame_rate,
            duration_secs: plan.video.duration_secs,
            crop: plan.spec.crop(),
            segments: plan.estimates(),
            crop_filter: plan.spec.clone(),
            stats: plan.stats.clone(),
        }
    }

    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> ReframeResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Wrote analysis report");
        Ok(())
    }

    pub fn load(path: &Path) -> ReframeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
