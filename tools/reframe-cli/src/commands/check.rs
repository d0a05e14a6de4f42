//! Check external tools and the vision service.

use reframe_analysis::{HttpVisionClient, VisionClientConfig, VisionService};
use reframe_common::config::AppConfig;
use reframe_render_engine::command_exists;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Reframe System Check");
    println!("{}", "=".repeat(50));

    let mut all_required_ok = true;
    for binary in ["ffmpeg", "ffprobe"] {
        if command_exists(binary) {
            println!("[OK] {binary} found in PATH");
        } else {
            println!("[FAIL] {binary} not found in PATH");
            all_required_ok = false;
        }
    }

    let url = &config.analysis.service_url;
    let client = HttpVisionClient::new(VisionClientConfig::from(&config.analysis))?;
    match client.health_check().await {
        Ok(true) => println!("[OK] Vision service healthy at {url}"),
        Ok(false) => println!("[WARN] Vision service at {url} reports unhealthy"),
        Err(e) => println!("[WARN] Vision service unreachable at {url}: {e}"),
    }

    println!();
    if all_required_ok {
        println!("Required tools are available. Reframe is ready.");
        println!("Without the vision service every segment falls back to a centered crop.");
    } else {
        println!("Some required tools are missing. Install ffmpeg and retry.");
    }

    Ok(())
}
