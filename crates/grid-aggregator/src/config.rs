//! Configuration for the grid aggregator.

use serde::{Deserialize, Serialize};

use crate::dense::DEFAULT_STRIDE;

/// Configuration for the grid aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Cell size in meters used when a caller does not set one.
    pub default_cell_size_m: f64,

    /// Scalars per cell in the dense buffer.
    pub dense_stride: usize,

    /// Upper bound on `columns * rows` of a dense buffer.
    pub max_dense_cells: usize,

    /// Sort bins by value.
    pub sort_bins: bool,

    /// Lower percentile of the reported value domain (0-100).
    pub lower_percentile: f64,

    /// Upper percentile of the reported value domain (0-100).
    pub upper_percentile: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            default_cell_size_m: 1000.0,
            dense_stride: DEFAULT_STRIDE,
            max_dense_cells: 1 << 24,
            sort_bins: true,
            lower_percentile: 0.0,
            upper_percentile: 100.0,
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GRID_CELL_SIZE_M") {
            if let Ok(size) = val.parse() {
                config.default_cell_size_m = size;
            }
        }

        if let Ok(val) = std::env::var("GRID_DENSE_STRIDE") {
            if let Ok(stride) = val.parse() {
                config.dense_stride = stride;
            }
        }

        if let Ok(val) = std::env::var("GRID_MAX_DENSE_CELLS") {
            if let Ok(cells) = val.parse() {
                config.max_dense_cells = cells;
            }
        }

        if let Ok(val) = std::env::var("GRID_SORT_BINS") {
            config.sort_bins = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("GRID_LOWER_PERCENTILE") {
            if let Ok(p) = val.parse() {
                config.lower_percentile = p;
            }
        }

        if let Ok(val) = std::env::var("GRID_UPPER_PERCENTILE") {
            if let Ok(p) = val.parse() {
                config.upper_percentile = p;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.default_cell_size_m.is_finite() && self.default_cell_size_m > 0.0) {
            return Err("default_cell_size_m must be a positive number".to_string());
        }

        if self.dense_stride < 2 {
            return Err("dense_stride must be >= 2".to_string());
        }

        if self.max_dense_cells == 0 {
            return Err("max_dense_cells must be > 0".to_string());
        }

        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.lower_percentile) || !in_range(self.upper_percentile) {
            return Err("percentiles must be within 0-100".to_string());
        }

        if self.lower_percentile > self.upper_percentile {
            return Err("lower_percentile must be <= upper_percentile".to_string());
        }

        Ok(())
    }
}
