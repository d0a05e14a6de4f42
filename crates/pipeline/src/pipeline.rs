//! Reframing job orchestration.

use std::path::Path;
use std::sync::Arc;

use reframe_analysis::{
    AnalysisOutcome, AnalyzerConfig, FfmpegFrameSampler, FrameSampler, HttpVisionClient,
    SegmentAnalyzer, VisionClientConfig, VisionService,
};
use reframe_common::clock::JobClock;
use reframe_common::config::{AppConfig, RenderSettings};
use reframe_common::error::{ReframeError, ReframeResult};
use reframe_model::{ActionEstimate, AnalysisMethod, CropFilterSpec, TargetAspect, VideoInfo};
use reframe_processing_core::{
    segment, synthesize, CompilerConfig, CropFilterCompiler, PathSmoother,
};
use reframe_render_engine::{
    FfmpegRenderer, FfprobeProbe, ProgressCallback, RenderBackend, RenderJob, VideoProbe,
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::job::{ProcessingStats, ReframeRequest, ReframeResponse};
use crate::progress::{
    ProgressFn, ProgressTracker, ANALYSIS_DONE, COMPILE_DONE, PROBE_DONE, RENDER_CEILING,
    RENDER_DONE,
};

/// Creates a fresh renderer for every job.
pub type RendererFactory = Arc<dyn Fn() -> Box<dyn RenderBackend> + Send + Sync>;

/// Everything decided before rendering.
#[derive(Debug, Clone)]
pub struct ReframePlan {
    pub video: VideoInfo,
    pub aspect: TargetAspect,
    pub method: AnalysisMethod,
    /// One per segment, in segment order.
    pub outcomes: Vec<AnalysisOutcome>,
    pub spec: CropFilterSpec,
    pub stats: ProcessingStats,
    /// Started when the job began probing.
    pub clock: JobClock,
}

impl ReframePlan {
    pub fn estimates(&self) -> Vec<ActionEstimate> {
        self.outcomes.iter().map(|o| o.estimate.clone()).collect()
    }
}

/// Runs reframing jobs.
pub struct ReframePipeline {
    probe: Arc<dyn VideoProbe>,
    analyzer: SegmentAnalyzer,
    smoother: PathSmoother,
    compiler: CropFilterCompiler,
    renderer_factory: RendererFactory,
    max_segment_duration_secs: f64,
    render_settings: RenderSettings,
}

impl ReframePipeline {
    /// Pipeline backed by ffprobe, ffmpeg and the HTTP vision service.
    pub fn from_config(config: &AppConfig) -> ReframeResult<Self> {
        let client = HttpVisionClient::new(VisionClientConfig::from(&config.analysis))?;
        let renderer_factory: RendererFactory =
            Arc::new(|| Box::new(FfmpegRenderer::new()) as Box<dyn RenderBackend>);
        Ok(Self::new(
            config,
            Arc::new(FfprobeProbe::new()),
            Arc::new(client),
            Arc::new(FfmpegFrameSampler::new()),
            renderer_factory,
        ))
    }

    pub fn new(
        config: &AppConfig,
        probe: Arc<dyn VideoProbe>,
        service: Arc<dyn VisionService>,
        sampler: Arc<dyn FrameSampler>,
        renderer_factory: RendererFactory,
    ) -> Self {
        Self {
            probe,
            analyzer: SegmentAnalyzer::new(
                service,
                sampler,
                AnalyzerConfig::from(&config.analysis),
            ),
            smoother: PathSmoother::new(config.reframing.smoothing_radius),
            compiler: CropFilterCompiler::new(CompilerConfig::from(&config.reframing)),
            renderer_factory,
            max_segment_duration_secs: config.reframing.max_segment_duration_secs,
            render_settings: config.render.clone(),
        }
    }

    /// Probe the input and run every stage up to the compiled crop.
    pub async fn analyze(
        &self,
        request: &ReframeRequest,
        cancel: Option<watch::Receiver<bool>>,
        progress: Option<ProgressFn>,
    ) -> ReframeResult<ReframePlan> {
        let tracker = ProgressTracker::new(progress);
        self.plan(request, cancel, &tracker).await
    }

    /// Reframe `request.input` and render the result.
    ///
    /// Input errors and cancellation return `Err`. Render failures return
    /// `Ok` with `success: false`, the error message and the analysis trail.
    pub async fn reframe(
        &self,
        request: &ReframeRequest,
        cancel: Option<watch::Receiver<bool>>,
        progress: Option<ProgressFn>,
    ) -> ReframeResult<ReframeResponse> {
        let tracker = Arc::new(ProgressTracker::new(progress));
        let plan = self.plan(request, cancel.clone(), &tracker).await?;
        self.finish(request, &plan, cancel, tracker).await
    }

    /// Render a plan produced by [`analyze`](Self::analyze) for the same
    /// request. Progress starts where analysis left off.
    pub async fn render_plan(
        &self,
        request: &ReframeRequest,
        plan: &ReframePlan,
        cancel: Option<watch::Receiver<bool>>,
        progress: Option<ProgressFn>,
    ) -> ReframeResult<ReframeResponse> {
        let tracker = Arc::new(ProgressTracker::new(progress));
        tracker.report(COMPILE_DONE);
        self.finish(request, plan, cancel, tracker).await
    }

    async fn finish(
        &self,
        request: &ReframeRequest,
        plan: &ReframePlan,
        cancel: Option<watch::Receiver<bool>>,
        tracker: Arc<ProgressTracker>,
    ) -> ReframeResult<ReframeResponse> {
        if is_cancelled(cancel.as_ref()) {
            info!("Job cancelled before rendering");
            return Err(ReframeError::Cancelled);
        }

        let output = request.output_path();
        let result = self.render(request, plan, &output, Arc::clone(&tracker)).await;

        let mut response = ReframeResponse {
            success: false,
            output_path: None,
            segments: plan.estimates(),
            processing_time_ms: 0,
            analysis_method: plan.method,
            crop_filter: Some(plan.spec.clone()),
            error: None,
            stats: plan.stats.clone(),
        };

        match result {
            Ok(path) => {
                tracker.report(RENDER_DONE);
                response.success = true;
                response.output_path = Some(path);
            }
            Err(err) => {
                warn!(error = %err, "Render failed, returning analysis trail");
                response.error = Some(err.to_string());
            }
        }
        response.processing_time_ms = plan.clock.elapsed_ms();

        info!(
            success = response.success,
            elapsed_ms = response.processing_time_ms,
            segments = response.segments.len(),
            "Reframing job finished"
        );
        Ok(response)
    }

    async fn plan(
        &self,
        request: &ReframeRequest,
        cancel: Option<watch::Receiver<bool>>,
        progress: &ProgressTracker,
    ) -> ReframeResult<ReframePlan> {
        let clock = JobClock::start();
        info!(
            input = %request.input.display(),
            aspect = %request.aspect,
            method = %request.method,
            "Starting reframing job"
        );
        progress.report(0.0);
        if is_cancelled(cancel.as_ref()) {
            return Err(ReframeError::Cancelled);
        }

        let video = self.probe_input(&request.input).await?;
        progress.report(PROBE_DONE);

        let max_segment = request
            .max_segment_duration_secs
            .unwrap_or(self.max_segment_duration_secs);
        let segments = segment(video.duration_secs, max_segment)?;

        let outcomes = self
            .analyzer
            .analyze_all(
                &request.input,
                &segments,
                request.method,
                cancel,
                |done, total| {
                    progress.report_span(PROBE_DONE, ANALYSIS_DONE, done as f64 / total as f64)
                },
            )
            .await?;
        progress.report(ANALYSIS_DONE);

        let estimates: Vec<ActionEstimate> = outcomes.iter().map(|o| o.estimate.clone()).collect();
        let path = synthesize(&estimates, video.duration_secs, video.frame_rate);
        let smoothed = self.smoother.smooth(&path);
        let spec = self.compiler.compile(&smoothed, &video, request.aspect);
        progress.report(COMPILE_DONE);

        let mut stats = ProcessingStats::from_outcomes(&outcomes);
        stats.path_frames = smoothed.len();
        stats.crop_kind = Some(spec.kind().to_string());

        info!(
            segments = stats.segment_count,
            degraded = stats.degraded_segments,
            fallbacks = stats.fallback_segments,
            average_confidence = stats.average_confidence,
            kind = spec.kind(),
            "Crop compiled"
        );

        Ok(ReframePlan {
            video,
            aspect: request.aspect,
            method: request.method,
            outcomes,
            spec,
            stats,
            clock,
        })
    }

    async fn probe_input(&self, input: &Path) -> ReframeResult<VideoInfo> {
        let probe = Arc::clone(&self.probe);
        let input = input.to_path_buf();
        tokio::task::spawn_blocking(move || probe.probe(&input))
            .await
            .map_err(|e| ReframeError::probe(format!("Probe task failed: {e}")))?
    }

    async fn render(
        &self,
        request: &ReframeRequest,
        plan: &ReframePlan,
        output: &Path,
        tracker: Arc<ProgressTracker>,
    ) -> ReframeResult<std::path::PathBuf> {
        let mut backend = (self.renderer_factory)();
        if !backend.is_available() {
            return Err(ReframeError::render(format!(
                "Render backend '{}' is not available (expected ffmpeg in PATH)",
                backend.name()
            )));
        }
        info!(backend = backend.name(), "Using render backend");

        let job = RenderJob {
            input: request.input.clone(),
            output: output.to_path_buf(),
            spec: plan.spec.clone(),
            video: plan.video,
            settings: self.render_settings.clone(),
        };
        let callback: ProgressCallback = Box::new(move |p| {
            tracker.report_span(COMPILE_DONE, RENDER_CEILING, p.progress);
        });

        tokio::task::spawn_blocking(move || backend.render(&job, Some(callback)))
            .await
            .map_err(|e| ReframeError::render(format!("Render task failed: {e}")))?
    }
}

fn is_cancelled(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}
