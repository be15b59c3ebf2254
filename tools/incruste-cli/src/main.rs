//! Ciné-Incruste CLI: plan performer segments and preview the live overlay.
//!
//! Usage:
//!   incruste plan <SCRIPT>       Run an edit script and export the segments
//!   incruste info <SNAPSHOT>     Show the segments of an export
//!   incruste preview <SNAPSHOT>  Play an export against the synthetic camera
//!   incruste check               Try to open the camera and segmentation model

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use incruste_common::config::{AppConfig, MAX_FRAME_RATE};

mod commands;

#[derive(Parser)]
#[command(
    name = "incruste",
    about = "Virtual studio: live performer overlays on a video timeline",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an edit script against a fresh timeline and export the result
    Plan {
        /// Path to the edit script
        script: PathBuf,

        /// Output file (defaults to the configured export file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the segments stored in an export
    Info {
        /// Path to the exported JSON
        path: PathBuf,

        /// Video duration used for timeline-bar geometry (seconds)
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Simulate playback of an export and drive the live compositor
    Preview {
        /// Path to the exported JSON
        path: PathBuf,

        /// Simulated video duration (defaults to the last out-point)
        #[arg(long)]
        duration: Option<f64>,

        /// Play-head advance per step (seconds)
        #[arg(long, default_value = "0.25")]
        step: f64,

        /// Wall-clock pause per step (milliseconds)
        #[arg(long, default_value = "40")]
        tick_ms: u64,

        /// Directory for PNG dumps of the presented overlay
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Use a camera that denies permission
        #[arg(long)]
        deny_camera: bool,
    },

    /// Check that a camera and segmentation model can be opened
    Check {
        /// Requested capture width
        #[arg(long)]
        width: Option<u32>,

        /// Requested capture height
        #[arg(long)]
        height: Option<u32>,

        /// Requested frame rate
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_FRAME_RATE as i64))]
        fps: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    incruste_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Plan { script, output } => commands::plan::run(&config, script, output),
        Commands::Info { path, duration } => commands::info::run(path, duration),
        Commands::Preview {
            path,
            duration,
            step,
            tick_ms,
            output_dir,
            deny_camera,
        } => {
            commands::preview::run(
                &config,
                commands::preview::PreviewArgs {
                    path,
                    duration,
                    step,
                    tick_ms,
                    output_dir,
                    deny_camera,
                },
            )
            .await
        }
        Commands::Check { width, height, fps } => {
            commands::check::run(&config, width, height, fps).await
        }
    }
}
