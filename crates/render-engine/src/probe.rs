//! Source video probing.

use std::path::{Path, PathBuf};
use std::process::Command;

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_model::VideoInfo;
use serde::Deserialize;

/// Reads [`VideoInfo`] from a media file.
pub trait VideoProbe: Send + Sync {
    fn probe(&self, path: &Path) -> ReframeResult<VideoInfo>;
}

/// [`VideoProbe`] backed by `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe: PathBuf,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }
}

impl VideoProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> ReframeResult<VideoInfo> {
        if !path.exists() {
            return Err(ReframeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,avg_frame_rate,r_frame_rate,duration:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| ReframeError::probe(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ReframeError::probe(format!(
                "ffprobe failed for {} ({}): {}",
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            duration_secs = info.duration_secs,
            frame_rate = info.frame_rate,
            "Probed source video"
        );
        Ok(info)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into [`VideoInfo`].
pub fn parse_probe_output(json: &str) -> ReframeResult<VideoInfo> {
    let parsed: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| ReframeError::probe(format!("Unreadable ffprobe output: {e}")))?;

    let stream = parsed
        .streams
        .first()
        .ok_or_else(|| ReframeError::probe("No video stream found"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) => (w, h),
        _ => return Err(ReframeError::probe("Video stream has no dimensions")),
    };

    let frame_rate = [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|rate| parse_frame_rate(rate))
        .ok_or_else(|| ReframeError::probe("Video stream has no usable frame rate"))?;

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(stream.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| ReframeError::probe("Video has no duration"))?;

    VideoInfo::new(width, height, duration_secs, frame_rate)
        .map_err(|e| ReframeError::invalid_input(e.to_string()))
}

/// Parse `"30000/1001"` or `"25"` into frames per second.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}
