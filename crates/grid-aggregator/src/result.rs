//! The unit of output handed to consumers.

use std::sync::Arc;

use serde::Serialize;

use crate::bins::{AggregationRule, SortedBins};
use crate::dense::{DenseAggregationBuffer, SummaryRecords};
use crate::geometry::GridGeometry;
use crate::types::{CellKey, GridCell, GridHash, GridOffset};

/// One complete aggregation pass.
///
/// Replaced as a whole on every recomputation and never mutated after
/// construction. The hash and dense buffer sit behind `Arc` so a re-bin can
/// share the hash of the previous pass and a GPU consumer can hold the
/// buffer past the next update.
#[derive(Debug, Clone)]
pub struct AggregationResult {
    pub grid_hash: Arc<GridHash>,
    pub grid_offset: GridOffset,
    /// `None` when the input was degenerate or empty.
    pub geometry: Option<GridGeometry>,
    pub rule: AggregationRule,
    pub bins: SortedBins,
    pub dense_buffer: Arc<DenseAggregationBuffer>,
    pub summary: SummaryRecords,
    pub min_value: f64,
    pub max_value: f64,
    pub total_count: u64,
    /// Records skipped for a non-finite position.
    pub dropped_points: usize,
    /// Percentile-trimmed value domain for color scales.
    pub value_domain: (f64, f64),
}

impl AggregationResult {
    /// Result with no cells and zero totals.
    pub fn empty(rule: AggregationRule, stride: usize) -> Self {
        Self {
            grid_hash: Arc::new(GridHash::new()),
            grid_offset: GridOffset::new(0.0, 0.0),
            geometry: None,
            rule,
            bins: SortedBins::empty(),
            dense_buffer: Arc::new(DenseAggregationBuffer::empty(stride)),
            summary: SummaryRecords::default(),
            min_value: 0.0,
            max_value: 0.0,
            total_count: 0,
            dropped_points: 0,
            value_domain: (0.0, 0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grid_hash.is_empty()
    }

    pub fn cell(&self, key: &CellKey) -> Option<&GridCell> {
        self.grid_hash.get(key)
    }

    /// Serializable overview without per-cell data.
    pub fn summary(&self) -> AggregationSummary {
        AggregationSummary {
            rule: self.rule,
            cells: self.grid_hash.len(),
            total_count: self.total_count,
            dropped_points: self.dropped_points,
            min_value: self.min_value,
            max_value: self.max_value,
            value_domain: self.value_domain,
            grid_offset: self.grid_offset,
            columns: self.geometry.map_or(0, |g| g.columns),
            rows: self.geometry.map_or(0, |g| g.rows),
            origin: self.geometry.map(|g| g.origin()),
            stride: self.dense_buffer.stride(),
            summary_records: self.summary,
        }
    }
}

/// Metadata of an [`AggregationResult`], as written by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationSummary {
    pub rule: AggregationRule,
    pub cells: usize,
    pub total_count: u64,
    pub dropped_points: usize,
    pub min_value: f64,
    pub max_value: f64,
    pub value_domain: (f64, f64),
    pub grid_offset: GridOffset,
    pub columns: usize,
    pub rows: usize,
    pub origin: Option<(f64, f64)>,
    pub stride: usize,
    pub summary_records: SummaryRecords,
}
