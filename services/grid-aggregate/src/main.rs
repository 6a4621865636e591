//! Grid aggregation command line tool.
//!
//! Bins point files into metric grids and writes, per input file:
//! - A JSON summary (extents, min/max, totals, summary records)
//! - The dense `f32` buffer ready for texture upload
//!
//! Input files are processed in parallel, each with its own aggregator.

mod input;
mod output;
mod pipeline;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use grid_aggregator::AggregatorConfig;
use grid_common::BoundingBox;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use input::FieldAccessor;
use pipeline::{process_all, Mode, Rule, Settings};

#[derive(Parser, Debug)]
#[command(name = "grid-aggregate")]
#[command(about = "Aggregate point files into metric grids")]
struct Args {
    /// Input files (JSON array, or one object per line for .ndjson/.jsonl)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Cell size in meters (default: GRID_CELL_SIZE_M or 1000)
    #[arg(long)]
    cell_size: Option<f64>,

    /// Aggregation rule
    #[arg(long, value_enum, default_value = "count")]
    rule: Rule,

    /// Coordinate space to bin in
    #[arg(long, value_enum, default_value = "geographic")]
    mode: Mode,

    /// Alignment extent as "minlon,minlat,maxlon,maxlat"
    #[arg(long)]
    bbox: Option<String>,

    /// Longitude field of each record
    #[arg(long, default_value = "lng")]
    lng_field: String,

    /// Latitude field of each record
    #[arg(long, default_value = "lat")]
    lat_field: String,

    /// Weight field read by sum/mean/min/max (every record weighs 1 if unset)
    #[arg(long)]
    weight_field: Option<String>,

    /// Directory for <input>.summary.json files
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Directory for <input>.dense.f32 files
    #[arg(long)]
    dense_out: Option<PathBuf>,

    /// Worker threads (default: one per core)
    #[arg(long, env = "GRID_THREADS")]
    threads: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let config = AggregatorConfig::from_env();
    if let Err(e) = config.validate() {
        bail!("Invalid configuration: {e}");
    }

    let bbox = args.bbox.as_deref().map(BoundingBox::parse).transpose()?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let settings = Settings {
        cell_size: args.cell_size.unwrap_or(config.default_cell_size_m),
        config,
        rule: args.rule.into(),
        mode: args.mode,
        bbox,
        accessor: FieldAccessor {
            lng_field: args.lng_field,
            lat_field: args.lat_field,
            weight_field: args.weight_field,
        },
        summary_out: args.summary_out,
        dense_out: args.dense_out,
    };

    info!(
        files = args.inputs.len(),
        cell_size = settings.cell_size,
        rule = %settings.rule,
        mode = ?settings.mode,
        "Starting grid aggregation"
    );

    let mut failures = 0usize;
    for (path, outcome) in process_all(&args.inputs, &settings) {
        match outcome {
            Ok(report) => println!("{}", serde_json::to_string(&report)?),
            Err(e) => {
                failures += 1;
                error!(input = %path.display(), error = %format!("{e:#}"), "Aggregation failed");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} files failed", args.inputs.len());
    }
    Ok(())
}
