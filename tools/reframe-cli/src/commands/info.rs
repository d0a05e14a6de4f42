//! Show source video information.

use std::path::PathBuf;

use reframe_model::{CropRect, TargetAspect};
use reframe_render_engine::{FfprobeProbe, VideoProbe};

pub fn run(input: PathBuf) -> anyhow::Result<()> {
    let info = FfprobeProbe::new()
        .probe(&input)
        .map_err(|e| anyhow::anyhow!("Failed to probe {}: {e}", input.display()))?;

    println!("Video: {}", input.display());
    println!("  Resolution: {}x{}", info.width, info.height);
    println!("  Aspect ratio: {:.3}", info.aspect_ratio());
    println!("  Frame rate: {:.3} fps", info.frame_rate);
    println!("  Duration: {:.2}s ({} frames)", info.duration_secs, info.frame_count());
    println!();

    println!("Crop windows:");
    for aspect in TargetAspect::ALL {
        let crop = CropRect::fit(info.width, info.height, aspect);
        println!("  {:>5}  {}x{}", aspect.to_string(), crop.width, crop.height);
    }

    Ok(())
}
