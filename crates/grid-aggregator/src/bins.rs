//! Per-cell value reduction and bin statistics.

use std::collections::HashMap;

use grid_common::{AggregationError, Result};
use serde::{Deserialize, Serialize};

use crate::accessor::PointAccessor;
use crate::types::{CellKey, GridCell, GridHash};

/// Reduction applied to the members of a cell.
///
/// `Count` ignores the value accessor. The other rules reduce the
/// accessor's weight over the members of the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationRule {
    #[default]
    Count,
    Sum,
    Mean,
    Min,
    Max,
}

impl AggregationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Whether the rule reads the value accessor.
    pub fn uses_weight(&self) -> bool {
        !matches!(self, Self::Count)
    }
}

impl std::fmt::Display for AggregationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An occupied cell with its aggregated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub key: CellKey,
    pub value: f64,
    pub counts: u32,
    /// Creation order of the underlying cell.
    pub cell_index: usize,
}

/// Bins of one aggregation pass plus their statistics.
#[derive(Debug, Clone, Default)]
pub struct SortedBins {
    pub bins: Vec<Bin>,
    pub min_value: f64,
    pub max_value: f64,
    pub total_count: u64,
    /// Bins are ordered by ascending value (else by cell creation order).
    pub sorted: bool,
    lookup: HashMap<CellKey, usize>,
}

impl SortedBins {
    /// No bins; min, max and total are zero.
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_bins(bins: Vec<Bin>, sorted: bool) -> Self {
        let mut min_value = f64::INFINITY;
        let mut max_value = f64::NEG_INFINITY;
        let mut total_count = 0u64;
        for bin in &bins {
            min_value = min_value.min(bin.value);
            max_value = max_value.max(bin.value);
            total_count += u64::from(bin.counts);
        }
        if bins.is_empty() {
            min_value = 0.0;
            max_value = 0.0;
        }

        let lookup = bins.iter().enumerate().map(|(i, b)| (b.key, i)).collect();

        Self {
            bins,
            min_value,
            max_value,
            total_count,
            sorted,
            lookup,
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bin for a cell key.
    pub fn get(&self, key: &CellKey) -> Option<&Bin> {
        self.lookup.get(key).map(|&i| &self.bins[i])
    }

    /// Value domain between two percentiles (0-100) of the bin values.
    ///
    /// The lower index rounds up and the upper index rounds down, so
    /// outliers are trimmed rather than included. Empty bins give `(0, 0)`.
    pub fn value_range(&self, lower_percentile: f64, upper_percentile: f64) -> (f64, f64) {
        if self.bins.is_empty() {
            return (0.0, 0.0);
        }

        let mut values: Vec<f64> = self.bins.iter().map(|b| b.value).collect();
        if !self.sorted {
            values.sort_by(f64::total_cmp);
        }

        let last = (values.len() - 1) as f64;
        let lower = lower_percentile.clamp(0.0, 100.0);
        let upper = upper_percentile.clamp(lower, 100.0);
        let lower_idx = (lower / 100.0 * last).ceil() as usize;
        let upper_idx = ((upper / 100.0 * last).floor() as usize).max(lower_idx);

        (values[lower_idx], values[upper_idx.min(values.len() - 1)])
    }
}

/// Turns a [`GridHash`] into bins according to an [`AggregationRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinAggregator {
    pub rule: AggregationRule,
    pub sort: bool,
}

impl BinAggregator {
    pub fn new(rule: AggregationRule) -> Self {
        Self { rule, sort: true }
    }

    pub fn with_sorting(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Aggregate every occupied cell of `grid_hash`.
    ///
    /// `records` must be the slice that was hashed. The first record the
    /// accessor cannot value aborts the pass with `InvalidAggregationRule`.
    pub fn aggregate<T, A>(&self, grid_hash: &GridHash, records: &[T], accessor: &A) -> Result<SortedBins>
    where
        A: PointAccessor<T>,
    {
        let mut cells: Vec<&GridCell> = grid_hash.values().collect();
        cells.sort_by_key(|c| c.index);

        let mut bins = Vec::with_capacity(cells.len());
        for cell in cells {
            let value = match self.reduce(cell, records, accessor) {
                Ok(value) => value,
                Err(err) => {
                    tracing::error!(rule = %self.rule, error = %err, "Aggregation rule failed");
                    return Err(err);
                }
            };
            bins.push(Bin {
                key: cell.key,
                value,
                counts: cell.count,
                cell_index: cell.index,
            });
        }

        if self.sort {
            // stable: equal values keep creation order
            bins.sort_by(|a, b| a.value.total_cmp(&b.value));
        }

        Ok(SortedBins::from_bins(bins, self.sort))
    }

    fn reduce<T, A>(&self, cell: &GridCell, records: &[T], accessor: &A) -> Result<f64>
    where
        A: PointAccessor<T>,
    {
        if !self.rule.uses_weight() {
            return Ok(f64::from(cell.count));
        }

        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &index in &cell.member_indices {
            let record = records
                .get(index)
                .ok_or_else(|| AggregationError::invalid_rule(index, "member index out of range"))?;
            let weight = accessor
                .weight(record)
                .ok_or_else(|| AggregationError::invalid_rule(index, "no value for record"))?;
            if !weight.is_finite() {
                return Err(AggregationError::invalid_rule(
                    index,
                    format!("non-finite value {weight}"),
                ));
            }
            sum += weight;
            min = min.min(weight);
            max = max.max(weight);
        }

        Ok(match self.rule {
            AggregationRule::Count => f64::from(cell.count),
            AggregationRule::Sum => sum,
            AggregationRule::Mean => sum / cell.member_indices.len().max(1) as f64,
            AggregationRule::Min => min,
            AggregationRule::Max => max,
        })
    }
}

impl Default for BinAggregator {
    fn default() -> Self {
        Self::new(AggregationRule::Count)
    }
}
