//! Per-file aggregation runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use grid_aggregator::{
    AggregationInput, AggregationOrchestrator, AggregationProps, AggregationResult,
    AggregationRule, AggregationSummary, AggregatorConfig, ChangeFlags, CoordinateSpace,
};
use grid_common::{BoundingBox, Projection, WebMercator};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::input::{load_records, FieldAccessor, Record};
use crate::output::{output_stem, write_dense, write_summary};

/// Space points are binned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Longitude/latitude with metric cells
    Geographic,
    /// Web Mercator meters
    Mercator,
}

/// Aggregation rule selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Rule {
    /// Number of points per cell
    Count,
    /// Sum of weights
    Sum,
    /// Mean weight
    #[value(alias = "avg", alias = "average")]
    Mean,
    /// Smallest weight
    Min,
    /// Largest weight
    Max,
}

impl From<Rule> for AggregationRule {
    fn from(rule: Rule) -> Self {
        match rule {
            Rule::Count => Self::Count,
            Rule::Sum => Self::Sum,
            Rule::Mean => Self::Mean,
            Rule::Min => Self::Min,
            Rule::Max => Self::Max,
        }
    }
}

/// Everything one aggregation run needs besides its input file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: AggregatorConfig,
    pub cell_size: f64,
    pub rule: AggregationRule,
    pub mode: Mode,
    /// Alignment extent in longitude/latitude.
    pub bbox: Option<BoundingBox>,
    pub accessor: FieldAccessor,
    pub summary_out: Option<PathBuf>,
    pub dense_out: Option<PathBuf>,
}

/// Outcome of one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub records: usize,
    pub summary: AggregationSummary,
    pub summary_path: Option<PathBuf>,
    pub dense_path: Option<PathBuf>,
}

impl Settings {
    fn props(&self, projection: &WebMercator) -> AggregationProps {
        let space = match self.mode {
            Mode::Geographic => CoordinateSpace::Geographic,
            Mode::Mercator => CoordinateSpace::Projected,
        };
        let mut props = AggregationProps::from_config(&self.config)
            .with_cell_size(self.cell_size)
            .with_rule(self.rule)
            .with_space(space);

        if let Some(bbox) = self.bbox {
            props = props.with_bounding_box(match self.mode {
                Mode::Geographic => bbox,
                Mode::Mercator => project_bbox(&bbox, projection),
            });
        }
        props
    }
}

/// Project the corners of a longitude/latitude box.
fn project_bbox(bbox: &BoundingBox, projection: &dyn Projection) -> BoundingBox {
    let (min_x, min_y) = projection.project(bbox.min_x, bbox.min_y);
    let (max_x, max_y) = projection.project(bbox.max_x, bbox.max_y);
    BoundingBox::new(min_x, min_y, max_x, max_y)
}

/// Aggregate records with a fresh orchestrator.
pub fn aggregate_records(records: &[Record], settings: &Settings) -> Result<Arc<AggregationResult>> {
    let projection = WebMercator::new();
    let mut orchestrator = AggregationOrchestrator::new(settings.config.clone())?;
    orchestrator.set_props(settings.props(&projection))?;

    let mut input = AggregationInput::new(records, &settings.accessor);
    if settings.mode == Mode::Mercator {
        input = input.with_projection(&projection);
    }

    Ok(orchestrator.update(&input, &ChangeFlags::data())?)
}

/// Load, aggregate and write the outputs of one file.
pub fn process_file(path: &Path, settings: &Settings) -> Result<FileReport> {
    let records = load_records(path)?;
    debug!(input = %path.display(), records = records.len(), "Loaded records");

    let result = aggregate_records(&records, settings).with_context(|| format!("Failed to aggregate {}", path.display()))?;

    let stem = output_stem(path);
    let summary = result.summary();
    let summary_path = match &settings.summary_out {
        Some(dir) => Some(write_summary(dir, &stem, &summary)?),
        None => None,
    };
    let dense_path = match &settings.dense_out {
        Some(dir) => Some(write_dense(dir, &stem, &result.dense_buffer)?),
        None => None,
    };

    info!(
        input = %path.display(),
        cells = summary.cells,
        total_count = summary.total_count,
        dropped = summary.dropped_points,
        columns = summary.columns,
        rows = summary.rows,
        "Aggregated file"
    );

    Ok(FileReport {
        input: path.to_path_buf(),
        records: records.len(),
        summary,
        summary_path,
        dense_path,
    })
}

/// Process every file in parallel. Each file gets its own orchestrator;
/// nothing is shared between runs.
pub fn process_all(paths: &[PathBuf], settings: &Settings) -> Vec<(PathBuf, Result<FileReport>)> {
    paths
        .par_iter()
        .map(|path| (path.clone(), process_file(path, settings)))
        .collect()
}
