//! NWP decomposer service.
//!
//! Ingests NWP runs into cascade and motion artifacts, and inspects the
//! windows those artifacts can serve to nowcast issue times.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use commands::IngestRequest;
use nwp_blending::StoreConfig;

#[derive(Parser, Debug)]
#[command(name = "nwp-decomposer")]
#[command(about = "Decompose NWP runs into cascade artifacts for nowcast blending")]
struct Args {
    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose a (T, H, W) Zarr field stack and estimate its motion
    Ingest {
        /// Input field stack (Zarr V3 directory)
        #[arg(short, long)]
        input: PathBuf,

        /// NWP model name
        #[arg(short, long)]
        model: String,

        /// Analysis time of the run (RFC 3339)
        #[arg(long)]
        analysis_time: DateTime<Utc>,

        /// Minutes between consecutive lead times
        #[arg(long, default_value_t = 5)]
        timestep_minutes: i64,

        /// Number of cascade levels
        #[arg(long, default_value_t = 8)]
        num_levels: usize,

        /// Artifact directory (overrides NWP_OUTPUT_PATH)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (overrides NWP_NUM_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Load the window a nowcast issued at START would use and print a summary
    Inspect {
        /// Decomposition artifact
        #[arg(long)]
        decomposition: PathBuf,

        /// Motion artifact
        #[arg(long)]
        motion: PathBuf,

        /// Nowcast issue time (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// Number of steps beyond the start time
        #[arg(long)]
        steps: usize,
    },
}

fn main() -> Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    match args.command {
        Command::Ingest {
            input,
            model,
            analysis_time,
            timestep_minutes,
            num_levels,
            output,
            workers,
        } => {
            let mut config = StoreConfig::from_env();
            if let Some(output) = output {
                config.output_path = output;
            }
            if workers.is_some() {
                config.num_workers = workers;
            }
            info!(
                output = %config.output_path.display(),
                compression = %config.compression,
                workers = ?config.num_workers,
                "Starting NWP ingestion"
            );

            let request = IngestRequest {
                input,
                model,
                analysis_time,
                timestep_minutes,
                num_levels,
            };
            let summary = commands::ingest(&request, config)?;
            info!(
                model = %summary.model,
                decomposition = %summary.decomposition.display(),
                motion = %summary.motion.display(),
                "Ingestion complete"
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Inspect {
            decomposition,
            motion,
            start,
            steps,
        } => match commands::inspect(&decomposition, &motion, start, steps) {
            Ok(summary) => {
                let json = serde_json::to_string_pretty(&summary)
                    .context("Failed to serialize window summary")?;
                println!("{}", json);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) if e.is_unservable() => {
                warn!(start = %start, steps, error = %e, "Window cannot be served");
                Ok(ExitCode::from(2))
            }
            Err(e) => Err(e).context("Failed to load window"),
        },
    }
}
