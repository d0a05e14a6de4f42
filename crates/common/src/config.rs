//! Application configuration.
//!
//! Values that influence pipeline decisions (the degraded estimate, the
//! low-motion threshold, concurrency caps) live here and are passed down
//! explicitly to the stages that need them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReframeError, ReframeResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Vision analysis service settings.
    pub analysis: AnalysisSettings,

    /// Crop-path synthesis, smoothing and compilation settings.
    pub reframing: ReframingSettings,

    /// Renderer settings.
    pub render: RenderSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Settings for the external vision analysis service and the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Base URL of the vision analysis service.
    pub service_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries for retryable failures (network, timeout, 5xx).
    pub max_retries: u32,

    /// Maximum number of in-flight analysis requests per job.
    pub max_concurrent_requests: usize,

    /// Hybrid mode re-runs a segment with the secondary method below this.
    pub confidence_threshold: f64,

    /// Number of representative frames sampled by the secondary method.
    pub secondary_samples: usize,

    /// Estimate substituted when analysis of a segment fails.
    pub degraded_center_x: f64,
    pub degraded_center_y: f64,
    pub degraded_confidence: f64,
}

/// Settings for the pure reframing stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReframingSettings {
    /// Upper bound on segment length (seconds).
    pub max_segment_duration_secs: f64,

    /// Half-width of the smoothing window (frames).
    pub smoothing_radius: usize,

    /// Population variance of `x(t)` (pixels squared) below which a static
    /// crop is emitted.
    pub low_motion_variance_px2: f64,

    /// Maximum number of key points in a dynamic crop.
    pub max_key_points: usize,
}

/// Renderer settings (ffmpeg backend).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// x264 preset.
    pub preset: String,

    /// Constant rate factor.
    pub crf: u32,

    /// Copy the source audio stream instead of re-encoding it.
    pub copy_audio: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reframe=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8001".to_string(),
            timeout_secs: 60,
            max_retries: 2,
            max_concurrent_requests: 4,
            confidence_threshold: 0.7,
            secondary_samples: 3,
            degraded_center_x: 0.5,
            degraded_center_y: 0.5,
            degraded_confidence: 0.3,
        }
    }
}

impl Default for ReframingSettings {
    fn default() -> Self {
        Self {
            max_segment_duration_secs: 10.0,
            smoothing_radius: 5,
            low_motion_variance_px2: 100.0,
            max_key_points: 10,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            preset: "medium".to_string(),
            crf: 20,
            copy_audio: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    ///
    /// Environment overrides are applied on top of whatever was loaded.
    pub fn load() -> Self {
        let config_path = config_file_path();
        let mut config = Self::default();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(loaded) => config = loaded,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        config.apply_env_overrides();
        config
    }

    /// Load config from an explicit path. Errors are surfaced to the caller.
    pub fn load_from(path: &Path) -> ReframeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Apply `REFRAME_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("REFRAME_ANALYSIS_URL") {
            self.analysis.service_url = url;
        }
        if let Some(timeout) = env_parse("REFRAME_ANALYSIS_TIMEOUT") {
            self.analysis.timeout_secs = timeout;
        }
        if let Some(retries) = env_parse("REFRAME_ANALYSIS_RETRIES") {
            self.analysis.max_retries = retries;
        }
        if let Some(concurrency) = env_parse("REFRAME_MAX_CONCURRENCY") {
            self.analysis.max_concurrent_requests = concurrency;
        }
    }

    /// Reject values no pipeline stage can work with.
    pub fn validate(&self) -> ReframeResult<()> {
        let a = &self.analysis;
        if a.max_concurrent_requests == 0 {
            return Err(ReframeError::config(
                "analysis.max_concurrent_requests must be at least 1",
            ));
        }
        if a.secondary_samples == 0 {
            return Err(ReframeError::config(
                "analysis.secondary_samples must be at least 1",
            ));
        }
        for (name, value) in [
            ("analysis.confidence_threshold", a.confidence_threshold),
            ("analysis.degraded_center_x", a.degraded_center_x),
            ("analysis.degraded_center_y", a.degraded_center_y),
            ("analysis.degraded_confidence", a.degraded_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReframeError::config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        let r = &self.reframing;
        if !r.max_segment_duration_secs.is_finite() || r.max_segment_duration_secs <= 0.0 {
            return Err(ReframeError::config(
                "reframing.max_segment_duration_secs must be positive",
            ));
        }
        if !r.low_motion_variance_px2.is_finite() || r.low_motion_variance_px2 < 0.0 {
            return Err(ReframeError::config(
                "reframing.low_motion_variance_px2 must be non-negative",
            ));
        }
        if r.max_key_points < 2 {
            return Err(ReframeError::config(
                "reframing.max_key_points must be at least 2",
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reframe").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.confidence_threshold, 0.7);
        assert_eq!(config.reframing.smoothing_radius, 5);
        assert_eq!(config.reframing.max_key_points, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "analysis": { "service_url": "http://vision:9000" }, "reframing": { "max_key_points": 16 } }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.analysis.service_url, "http://vision:9000");
        assert_eq!(config.analysis.max_concurrent_requests, 4);
        assert_eq!(config.reframing.max_key_points, 16);
        assert_eq!(config.reframing.smoothing_radius, 5);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config.analysis.max_concurrent_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = AppConfig::default();
        config.analysis.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_single_key_point() {
        let mut config = AppConfig::default();
        config.reframing.max_key_points = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load_from(&dir.path().join("missing.json")).is_err());
    }
}
