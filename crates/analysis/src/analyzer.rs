//! Segment analyzer with primary/secondary/hybrid strategies.
//!
//! Every per-segment failure (sampling, transport, HTTP status, malformed
//! body) is absorbed here and replaced with the configured degraded estimate.
//! [`SegmentAnalyzer::analyze_all`] bounds in-flight requests with a
//! semaphore, keeps results in segment order, and stops early when the job's
//! cancellation signal fires.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reframe_common::config::AnalysisSettings;
use reframe_model::{ActionEstimate, AnalysisMethod, EstimateSource, Segment};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use crate::client::VisionService;
use crate::error::{AnalysisError, AnalysisResult};
use crate::sampler::FrameSampler;
use crate::types::{AnalysisHint, AnalyzeRequest, AnalyzeResponse};

/// Estimate substituted when a segment cannot be analyzed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegradedEstimate {
    pub center_x: f64,
    pub center_y: f64,
    pub confidence: f64,
}

impl Default for DegradedEstimate {
    fn default() -> Self {
        Self {
            center_x: 0.5,
            center_y: 0.5,
            confidence: 0.3,
        }
    }
}

/// Analyzer tuning.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Hybrid mode falls back to the secondary method below this confidence.
    pub confidence_threshold: f64,
    /// Frames sampled per segment by the secondary method.
    pub secondary_samples: usize,
    /// Cap on concurrently analyzed segments.
    pub max_concurrent_requests: usize,
    pub degraded: DegradedEstimate,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from(&AnalysisSettings::default())
    }
}

impl From<&AnalysisSettings> for AnalyzerConfig {
    fn from(settings: &AnalysisSettings) -> Self {
        Self {
            confidence_threshold: settings.confidence_threshold,
            secondary_samples: settings.secondary_samples,
            max_concurrent_requests: settings.max_concurrent_requests,
            degraded: DegradedEstimate {
                center_x: settings.degraded_center_x,
                center_y: settings.degraded_center_y,
                confidence: settings.degraded_confidence,
            },
        }
    }
}

/// Result of analyzing one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub estimate: ActionEstimate,
    /// Hybrid mode re-ran this segment with the secondary method.
    pub fallback_triggered: bool,
}

/// Produces [`ActionEstimate`]s for segments of one source video.
pub struct SegmentAnalyzer {
    service: Arc<dyn VisionService>,
    sampler: Arc<dyn FrameSampler>,
    config: AnalyzerConfig,
}

impl SegmentAnalyzer {
    pub fn new(
        service: Arc<dyn VisionService>,
        sampler: Arc<dyn FrameSampler>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            service,
            sampler,
            config,
        }
    }

    /// Analyze every segment, at most `max_concurrent_requests` at a time.
    ///
    /// Results come back in segment order. `on_progress(done, total)` is
    /// called as segments finish. Analysis images live in a temporary
    /// directory that is removed before this returns, whatever the outcome.
    pub async fn analyze_all<F>(
        &self,
        input: &Path,
        segments: &[Segment],
        method: AnalysisMethod,
        cancel: Option<watch::Receiver<bool>>,
        on_progress: F,
    ) -> AnalysisResult<Vec<AnalysisOutcome>>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let work_dir = tempfile::Builder::new()
            .prefix("reframe-analysis-")
            .tempdir()?;
        let semaphore = Semaphore::new(self.config.max_concurrent_requests.max(1));
        let completed = AtomicUsize::new(0);
        let total = segments.len();

        info!(
            segments = total,
            %method,
            max_concurrent = self.config.max_concurrent_requests,
            "Analyzing segments"
        );

        let tasks = segments.iter().map(|segment| {
            let semaphore = &semaphore;
            let completed = &completed;
            let on_progress = &on_progress;
            let work_dir = work_dir.path();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| AnalysisError::Cancelled)?;
                let outcome = self.analyze(input, work_dir, segment, method).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                on_progress(done, total);
                Ok::<_, AnalysisError>(outcome)
            }
        });
        let all = futures::future::join_all(tasks);

        let results = match cancel {
            Some(mut rx) => {
                tokio::select! {
                    biased;
                    _ = wait_for_cancel(&mut rx) => {
                        info!("Analysis cancelled, discarding in-flight segments");
                        return Err(AnalysisError::Cancelled);
                    }
                    results = all => results,
                }
            }
            None => all.await,
        };

        results.into_iter().collect()
    }

    /// Analyze one segment with the given strategy. Never fails.
    pub async fn analyze(
        &self,
        input: &Path,
        work_dir: &Path,
        segment: &Segment,
        method: AnalysisMethod,
    ) -> AnalysisOutcome {
        match method {
            AnalysisMethod::Primary => AnalysisOutcome {
                estimate: self.primary(input, work_dir, segment).await,
                fallback_triggered: false,
            },
            AnalysisMethod::Secondary => AnalysisOutcome {
                estimate: self.secondary(input, work_dir, segment).await,
                fallback_triggered: false,
            },
            AnalysisMethod::Hybrid => {
                let primary = self.primary(input, work_dir, segment).await;
                if primary.confidence >= self.config.confidence_threshold {
                    return AnalysisOutcome {
                        estimate: primary,
                        fallback_triggered: false,
                    };
                }
                debug!(
                    start = segment.start_secs,
                    confidence = primary.confidence,
                    threshold = self.config.confidence_threshold,
                    "Low confidence, falling back to secondary analysis"
                );
                AnalysisOutcome {
                    estimate: self.secondary(input, work_dir, segment).await,
                    fallback_triggered: true,
                }
            }
        }
    }

    /// One composite image per segment.
    async fn primary(&self, input: &Path, work_dir: &Path, segment: &Segment) -> ActionEstimate {
        let image = work_dir.join(format!(
            "seg_{:09}_composite.jpg",
            millis(segment.start_secs)
        ));
        let result = async {
            self.sampler
                .composite_frame(input, segment, &image)
                .await?;
            let response = self
                .service
                .analyze(&AnalyzeRequest {
                    image_path: image.clone(),
                    hint: AnalysisHint::Composite,
                    start_time: segment.start_secs,
                    end_time: segment.end_secs,
                })
                .await?;
            validate_response(&response)
        }
        .await;

        match result {
            Ok(sample) => sample.into_estimate(*segment, EstimateSource::Primary),
            Err(e) => {
                warn!(
                    start = segment.start_secs,
                    error = %e,
                    "Primary analysis failed, using degraded estimate"
                );
                self.degraded(segment)
            }
        }
    }

    /// Several single frames per segment, averaged over the ones that succeed.
    async fn secondary(
        &self,
        input: &Path,
        work_dir: &Path,
        segment: &Segment,
    ) -> ActionEstimate {
        let times = sample_times(segment, self.config.secondary_samples);
        let mut samples = Vec::with_capacity(times.len());

        for (i, &t) in times.iter().enumerate() {
            let image = work_dir.join(format!(
                "seg_{:09}_frame_{i}.jpg",
                millis(segment.start_secs)
            ));
            let result = async {
                self.sampler.frame_at(input, t, &image).await?;
                let response = self
                    .service
                    .analyze(&AnalyzeRequest {
                        image_path: image.clone(),
                        hint: AnalysisHint::Subject,
                        start_time: t,
                        end_time: t,
                    })
                    .await?;
                validate_response(&response)
            }
            .await;

            match result {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    warn!(
                        start = segment.start_secs,
                        time = t,
                        error = %e,
                        "Secondary sample failed"
                    );
                }
            }
        }

        if samples.is_empty() {
            warn!(
                start = segment.start_secs,
                "All secondary samples failed, using degraded estimate"
            );
            return self.degraded(segment);
        }

        let n = samples.len() as f64;
        let mean = Sample {
            center_x: samples.iter().map(|s| s.center_x).sum::<f64>() / n,
            center_y: samples.iter().map(|s| s.center_y).sum::<f64>() / n,
            confidence: samples.iter().map(|s| s.confidence).sum::<f64>() / n,
            labels: samples.into_iter().flat_map(|s| s.labels).collect(),
        };
        mean.into_estimate(*segment, EstimateSource::Secondary)
    }

    fn degraded(&self, segment: &Segment) -> ActionEstimate {
        let d = self.config.degraded;
        ActionEstimate::degraded(*segment, d.center_x, d.center_y, d.confidence)
    }
}

/// `n` timestamps evenly spaced strictly inside the segment.
pub fn sample_times(segment: &Segment, n: usize) -> Vec<f64> {
    let n = n.max(1);
    (0..n)
        .map(|i| segment.start_secs + (i + 1) as f64 * segment.duration_secs / (n + 1) as f64)
        .collect()
}

/// A validated service response.
#[derive(Debug, Clone)]
struct Sample {
    center_x: f64,
    center_y: f64,
    confidence: f64,
    labels: BTreeSet<String>,
}

impl Sample {
    fn into_estimate(self, segment: Segment, source: EstimateSource) -> ActionEstimate {
        let mut estimate = ActionEstimate::new(
            segment,
            self.center_x,
            self.center_y,
            self.confidence,
            source,
        );
        estimate.labels = self.labels;
        estimate
    }
}

fn validate_response(response: &AnalyzeResponse) -> AnalysisResult<Sample> {
    let field = |name: &str, value: Option<f64>| -> AnalysisResult<f64> {
        match value {
            Some(v) if v.is_finite() && (0.0..=1.0).contains(&v) => Ok(v),
            Some(v) => Err(AnalysisError::InvalidResponse(format!(
                "{name} out of range: {v}"
            ))),
            None => Err(AnalysisError::InvalidResponse(format!("missing {name}"))),
        }
    };

    Ok(Sample {
        center_x: field("centerX", response.center_x)?,
        center_y: field("centerY", response.center_y)?,
        confidence: field("confidence", response.confidence)?,
        labels: response
            .labels
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

/// Resolve once the signal reads `true`; never resolve if the sender is gone.
async fn wait_for_cancel(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn millis(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(cx: Option<f64>, cy: Option<f64>, conf: Option<f64>) -> AnalyzeResponse {
        AnalyzeResponse {
            center_x: cx,
            center_y: cy,
            confidence: conf,
            labels: vec!["run".into(), " ".into(), "run".into(), "jump".into()],
        }
    }

    #[test]
    fn test_sample_times_are_strictly_inside() {
        let times = sample_times(&Segment::new(10.0, 18.0), 3);
        assert_eq!(times, vec![12.0, 14.0, 16.0]);
        assert_eq!(sample_times(&Segment::new(0.0, 4.0), 1), vec![2.0]);
    }

    #[test]
    fn test_validate_accepts_in_range() {
        let sample = validate_response(&response(Some(0.0), Some(1.0), Some(0.5))).unwrap();
        assert_eq!(sample.center_x, 0.0);
        let labels: Vec<_> = sample.labels.into_iter().collect();
        assert_eq!(labels, vec!["jump".to_string(), "run".to_string()]);
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert!(validate_response(&response(Some(1.2), Some(0.5), Some(0.5))).is_err());
        assert!(validate_response(&response(Some(0.5), Some(f64::NAN), Some(0.5))).is_err());
        assert!(validate_response(&response(Some(0.5), Some(0.5), Some(-0.1))).is_err());
        assert!(validate_response(&response(None, Some(0.5), Some(0.5))).is_err());
    }

    #[test]
    fn test_config_from_settings() {
        let settings = AnalysisSettings {
            degraded_confidence: 0.1,
            confidence_threshold: 0.6,
            ..AnalysisSettings::default()
        };
        let config = AnalyzerConfig::from(&settings);
        assert_eq!(config.degraded.confidence, 0.1);
        assert_eq!(config.degraded.center_x, 0.5);
        assert_eq!(config.confidence_threshold, 0.6);
        assert_eq!(config.secondary_samples, 3);
    }

    #[tokio::test]
    async fn test_wait_for_cancel_observes_signal() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { wait_for_cancel(&mut rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
