//! Reframe a video and render the result.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use reframe_common::config::AppConfig;
use reframe_pipeline::{AnalysisReport, ProgressFn, ReframePipeline};

use super::{cancel_on_ctrl_c, JobArgs};

pub async fn run(
    config: &AppConfig,
    args: JobArgs,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut request = args.into_request()?;
    if let Some(output) = output {
        request = request.with_output(output);
    }

    println!("Reframing: {}", request.input.display());
    println!("  Aspect: {}", request.aspect);
    println!("  Method: {}", request.method);
    println!("  Output: {}", request.output_path().display());

    let pipeline = ReframePipeline::from_config(config)?;

    let progress: ProgressFn = Arc::new(|p| {
        print!("\r  Progress: {p:.1}%  ");
        let _ = std::io::stdout().flush();
    });

    let cancel = cancel_on_ctrl_c();

    let response = match &report {
        Some(report_path) => {
            let plan = pipeline
                .analyze(&request, Some(cancel.clone()), Some(progress.clone()))
                .await?;
            AnalysisReport::from_plan(&request.input, &plan).write(report_path)?;
            pipeline
                .render_plan(&request, &plan, Some(cancel), Some(progress))
                .await?
        }
        None => {
            pipeline
                .reframe(&request, Some(cancel), Some(progress))
                .await?
        }
    };

    println!();
    println!(
        "  Segments: {} ({} degraded, {} fallback)",
        response.stats.segment_count,
        response.stats.degraded_segments,
        response.stats.fallback_segments
    );
    println!(
        "  Average confidence: {:.2}",
        response.stats.average_confidence
    );
    if let Some(kind) = &response.stats.crop_kind {
        println!("  Crop: {kind}");
    }
    if let Some(report_path) = &report {
        println!("  Report: {}", report_path.display());
    }

    match (&response.output_path, &response.error) {
        (Some(path), _) if response.success => {
            println!(
                "Reframe complete in {:.1}s: {}",
                response.processing_time_ms as f64 / 1000.0,
                path.display()
            );
            Ok(())
        }
        (_, error) => Err(anyhow::anyhow!(
            "Render failed: {}",
            error.as_deref().unwrap_or("unknown error")
        )),
    }
}
