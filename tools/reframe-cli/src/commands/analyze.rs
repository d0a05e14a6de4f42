//! Analyze a video without rendering.

use std::path::PathBuf;

use reframe_common::config::AppConfig;
use reframe_pipeline::{AnalysisReport, ReframePipeline};

use super::{cancel_on_ctrl_c, JobArgs};

pub async fn run(config: &AppConfig, args: JobArgs, output: Option<PathBuf>) -> anyhow::Result<()> {
    let request = args.into_request()?;
    eprintln!("Analyzing: {}", request.input.display());

    let pipeline = ReframePipeline::from_config(config)?;
    let plan = pipeline
        .analyze(&request, Some(cancel_on_ctrl_c()), None)
        .await?;
    let report = AnalysisReport::from_plan(&request.input, &plan);

    eprintln!(
        "  {} segments, {} degraded, average confidence {:.2}, {} crop",
        plan.stats.segment_count,
        plan.stats.degraded_segments,
        plan.stats.average_confidence,
        plan.spec.kind()
    );

    match output {
        Some(path) => {
            report.write(&path)?;
            eprintln!("Report saved to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
