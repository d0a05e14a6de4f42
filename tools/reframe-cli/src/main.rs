//! Reframe CLI: content-aware reframing of videos to a new aspect ratio.
//!
//! Usage:
//!   reframe run <INPUT>        Reframe and render a video
//!   reframe analyze <INPUT>    Analyze only and write a JSON report
//!   reframe info <INPUT>       Show source video properties
//!   reframe check              Check ffmpeg and the vision service

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reframe_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reframe",
    about = "Reframe videos to a new aspect ratio, following the action",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/reframe/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reframe a video and render the result
    Run {
        /// Source video
        input: PathBuf,

        /// Output file (defaults to <input>_<W>x<H>.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target aspect ratio: 9:16, 16:9, 1:1 or 4:3
        #[arg(long, default_value = "9:16")]
        aspect: String,

        /// Analysis method: primary|secondary|hybrid
        #[arg(long, default_value = "hybrid")]
        method: String,

        /// Maximum segment length (seconds)
        #[arg(long)]
        max_segment: Option<f64>,

        /// Also write the JSON analysis report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Analyze a video and write a JSON report without rendering
    Analyze {
        /// Source video
        input: PathBuf,

        /// Target aspect ratio: 9:16, 16:9, 1:1 or 4:3
        #[arg(long, default_value = "9:16")]
        aspect: String,

        /// Analysis method: primary|secondary|hybrid
        #[arg(long, default_value = "hybrid")]
        method: String,

        /// Maximum segment length (seconds)
        #[arg(long)]
        max_segment: Option<f64>,

        /// Report path (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show source video information
    Info {
        /// Source video
        input: PathBuf,
    },

    /// Check external tools and the vision service
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    reframe_common::logging::init_logging(&config.logging);
    config.validate()?;

    match cli.command {
        Commands::Run {
            input,
            output,
            aspect,
            method,
            max_segment,
            report,
        } => {
            let args = commands::JobArgs {
                input,
                aspect,
                method,
                max_segment,
            };
            commands::run::run(&config, args, output, report).await
        }
        Commands::Analyze {
            input,
            aspect,
            method,
            max_segment,
            output,
        } => {
            let args = commands::JobArgs {
                input,
                aspect,
                method,
                max_segment,
            };
            commands::analyze::run(&config, args, output).await
        }
        Commands::Info { input } => commands::info::run(input),
        Commands::Check => commands::check::run(&config).await,
    }
}
