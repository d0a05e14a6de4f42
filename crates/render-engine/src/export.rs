//! Render jobs and the ffmpeg renderer backend.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reframe_common::config::RenderSettings;
use reframe_common::error::{ReframeError, ReframeResult};
use reframe_model::{CropFilterSpec, VideoInfo};

use crate::expr::build_crop_filter;

/// A compiled crop ready to be rendered.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Source video.
    pub input: PathBuf,

    /// Final output path. Only ever written by an atomic rename.
    pub output: PathBuf,

    /// Compiled crop instruction.
    pub spec: CropFilterSpec,

    /// Source properties (used for progress).
    pub video: VideoInfo,

    /// Encoder settings.
    pub settings: RenderSettings,
}

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Output timestamp reached so far.
    pub out_time_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: RenderStage,
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
}

/// Trait for renderer backends.
///
/// A backend instance belongs to a single job. Once a render has failed the
/// instance refuses further work.
pub trait RenderBackend: Send {
    /// Render the job and return the output path.
    fn render(
        &mut self,
        job: &RenderJob,
        progress: Option<ProgressCallback>,
    ) -> ReframeResult<PathBuf>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Renders crops with the `ffmpeg` binary.
#[derive(Debug)]
pub struct FfmpegRenderer {
    ffmpeg: PathBuf,
    failed: bool,
}

impl Default for FfmpegRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRenderer {
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            failed: false,
        }
    }

    pub fn with_binary(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            failed: false,
        }
    }

    /// Whether a previous render on this instance failed.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Full ffmpeg argument list writing to `output`.
    pub fn build_args(&self, job: &RenderJob, output: &Path) -> Vec<String> {
        let settings = &job.settings;
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            job.input.to_string_lossy().to_string(),
            "-vf".to_string(),
            build_crop_filter(&job.spec),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            settings.preset.clone(),
            "-crf".to_string(),
            settings.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ];
        if settings.copy_audio {
            args.extend(["-c:a".to_string(), "copy".to_string()]);
        } else {
            args.extend([
                "-c:a".to_string(),
                "aac".to_string(),
                "-b:a".to_string(),
                "128k".to_string(),
            ]);
        }
        args.extend([
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            output.to_string_lossy().to_string(),
        ]);
        args
    }

    fn render_inner(
        &self,
        job: &RenderJob,
        progress: Option<ProgressCallback>,
    ) -> ReframeResult<PathBuf> {
        if !job.input.exists() {
            return Err(ReframeError::FileNotFound {
                path: job.input.clone(),
            });
        }

        let parent = match job.output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        // Dropped (and deleted) on every early return below.
        let temp = tempfile::Builder::new()
            .prefix(".reframe-")
            .suffix(".mp4")
            .tempfile_in(&parent)?;

        if let Some(cb) = &progress {
            cb(RenderProgress {
                progress: 0.0,
                out_time_secs: 0.0,
                eta_secs: 0.0,
                stage: RenderStage::Preparing,
            });
        }

        let args = self.build_args(job, temp.path());
        self.run_ffmpeg(&args, job.video.duration_secs, progress.as_ref())?;

        if let Some(cb) = &progress {
            cb(RenderProgress {
                progress: 1.0,
                out_time_secs: job.video.duration_secs,
                eta_secs: 0.0,
                stage: RenderStage::Finalizing,
            });
        }

        temp.persist(&job.output).map_err(|e| {
            ReframeError::render(format!(
                "Failed to move rendered file to {}: {}",
                job.output.display(),
                e.error
            ))
        })?;

        if let Some(cb) = &progress {
            cb(RenderProgress {
                progress: 1.0,
                out_time_secs: job.video.duration_secs,
                eta_secs: 0.0,
                stage: RenderStage::Complete,
            });
        }
        Ok(job.output.clone())
    }

    fn run_ffmpeg(
        &self,
        args: &[String],
        expected_duration_secs: f64,
        progress: Option<&ProgressCallback>,
    ) -> ReframeResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let start = std::time::Instant::now();
        let mut child = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReframeError::render(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(pid = child.id(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReframeError::render("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReframeError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut state = ProgressState::default();
        for line in BufReader::new(stdout).lines() {
            let line = line
                .map_err(|e| ReframeError::render(format!("Failed reading ffmpeg progress: {e}")))?;
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                if let Some(cb) = progress {
                    cb(progress_report(
                        &state,
                        expected_duration_secs,
                        start.elapsed().as_secs_f64(),
                    ));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| ReframeError::render(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ReframeError::render(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg finished"
        );
        Ok(())
    }
}

impl RenderBackend for FfmpegRenderer {
    fn render(
        &mut self,
        job: &RenderJob,
        progress: Option<ProgressCallback>,
    ) -> ReframeResult<PathBuf> {
        if self.failed {
            return Err(ReframeError::render(
                "Renderer already failed once; create a new backend for another attempt",
            ));
        }

        tracing::info!(
            input = %job.input.display(),
            output = %job.output.display(),
            kind = job.spec.kind(),
            "Starting render"
        );

        match self.render_inner(job, progress) {
            Ok(path) => Ok(path),
            Err(err) => {
                self.failed = true;
                tracing::error!(error = %err, "Render failed");
                Err(err)
            }
        }
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg.to_string_lossy())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Whether `binary` resolves on `PATH` (or is an existing path).
pub fn command_exists(binary: &str) -> bool {
    if binary.contains('/') {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> RenderProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    RenderProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs,
        stage: if state.complete {
            RenderStage::Finalizing
        } else {
            RenderStage::Rendering
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_model::{CropRect, KeyPoint, TargetAspect};

    fn job(dir: &Path, spec: CropFilterSpec) -> RenderJob {
        let input = dir.join("in.mp4");
        std::fs::write(&input, b"not really a video").unwrap();
        RenderJob {
            input,
            output: dir.join("out").join("reframed.mp4"),
            spec,
            video: VideoInfo::new(1920, 1080, 10.0, 30.0).unwrap(),
            settings: RenderSettings::default(),
        }
    }

    fn static_spec() -> CropFilterSpec {
        CropFilterSpec::Static {
            crop: CropRect {
                width: 607,
                height: 1080,
            },
            x: 656,
            y: 0,
        }
    }

    #[test]
    fn test_build_args_static() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path(), static_spec());
        let args = FfmpegRenderer::new().build_args(&job, Path::new("/tmp/x.mp4"));

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(
            args[vf + 1],
            "crop=w=607:h=1080:x=656:y=0,scale=606:1080,format=yuv420p"
        );
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "20"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "copy"));
        assert!(args.windows(2).any(|w| w[0] == "-progress" && w[1] == "pipe:1"));
        assert_eq!(args.last().unwrap(), "/tmp/x.mp4");
    }

    #[test]
    fn test_build_args_encode_even_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        for (width, height) in [(1920, 1080), (1280, 720), (1080, 1920), (1001, 999)] {
            for aspect in TargetAspect::ALL {
                let crop = CropRect::fit(width, height, aspect);
                let spec = CropFilterSpec::Dynamic {
                    crop,
                    key_points: vec![KeyPoint::new(0.0, 0), KeyPoint::new(9.0, 1)],
                    y: 0,
                };
                let args =
                    FfmpegRenderer::new().build_args(&job(dir.path(), spec), Path::new("o.mp4"));
                assert!(args.windows(2).any(|w| w[0] == "-pix_fmt" && w[1] == "yuv420p"));

                let vf = &args[args.iter().position(|a| a == "-vf").unwrap() + 1];
                assert!(vf.starts_with(&format!("crop=w={}:h={}:", crop.width, crop.height)));
                let scale = vf
                    .rsplit(',')
                    .find_map(|f| f.strip_prefix("scale="))
                    .unwrap_or_else(|| panic!("no scale in {vf}"));
                let (w, h) = scale.split_once(':').unwrap();
                let (w, h): (u32, u32) = (w.parse().unwrap(), h.parse().unwrap());
                assert_eq!((w % 2, h % 2), (0, 0), "{width}x{height} {aspect}: {vf}");
                assert!(crop.width - w <= 1 && crop.height - h <= 1);
            }
        }
    }

    #[test]
    fn test_build_args_reencodes_audio_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(
            dir.path(),
            CropFilterSpec::Dynamic {
                crop: CropRect {
                    width: 607,
                    height: 1080,
                },
                key_points: vec![KeyPoint::new(0.0, 0), KeyPoint::new(9.9, 1313)],
                y: 0,
            },
        );
        job.settings.copy_audio = false;
        let args = FfmpegRenderer::new().build_args(&job, Path::new("o.mp4"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "aac"));
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert!(args[vf + 1].contains("x='if(lt(t,9.900000)"));
    }

    #[test]
    fn test_failed_render_leaves_no_output_and_poisons_backend() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path(), static_spec());
        let mut renderer = FfmpegRenderer::with_binary("/nonexistent/ffmpeg-binary");

        let err = renderer.render(&job, None).unwrap_err();
        assert!(matches!(err, ReframeError::Render { .. }));
        assert!(renderer.has_failed());
        assert!(!job.output.exists());

        // The temporary file beside the destination was cleaned up.
        let leftovers: Vec<_> = std::fs::read_dir(job.output.parent().unwrap())
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());

        let err = renderer.render(&job, None).unwrap_err();
        assert!(err.to_string().contains("already failed"));
    }

    #[test]
    fn test_missing_input_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path(), static_spec());
        job.input = dir.path().join("missing.mp4");
        let err = FfmpegRenderer::new().render(&job, None).unwrap_err();
        assert!(matches!(err, ReframeError::FileNotFound { .. }));
    }

    #[test]
    fn test_progress_report() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "5000000");
        let report = progress_report(&state, 10.0, 2.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert!((report.eta_secs - 2.0).abs() < 1e-9);
        assert_eq!(report.stage, RenderStage::Rendering);

        state.update("progress", "end");
        let report = progress_report(&state, 10.0, 4.0);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.stage, RenderStage::Finalizing);
    }

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely-not-a-real-binary-xyz"));
        assert!(!command_exists("/nonexistent/ffmpeg-binary"));
    }
}
