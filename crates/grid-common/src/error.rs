//! Error types for grid aggregation.

use thiserror::Error;

/// Errors that can occur while aggregating points into a grid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    /// The computed cell size is non-finite, non-positive or larger than
    /// the world. Recovered by producing an empty aggregation.
    #[error("degenerate grid geometry: {0}")]
    DegenerateGeometry(String),

    /// A bin resolved to a cell outside the dense buffer. This is a broken
    /// invariant between two independently computed grid geometries.
    #[error(
        "grid geometry mismatch: cell (column {column}, row {row}) is outside the {columns}x{rows} grid"
    )]
    GridGeometryMismatch {
        column: i64,
        row: i64,
        columns: usize,
        rows: usize,
    },

    /// The value accessor could not produce a value for a record.
    #[error("invalid aggregation rule: record {index}: {reason}")]
    InvalidAggregationRule { index: usize, reason: String },

    /// The requested cell size is not a positive finite number.
    #[error("invalid cell size: {0}")]
    InvalidCellSize(f64),

    /// The dense buffer would exceed the configured cell budget.
    #[error("dense grid of {cells} cells exceeds the limit of {limit}")]
    GridTooLarge { cells: usize, limit: usize },

    /// The bounding box supplied by the caller is unusable.
    #[error("invalid bounding box: {0}")]
    InvalidBbox(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl AggregationError {
    /// Create a DegenerateGeometry error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateGeometry(msg.into())
    }

    /// Create an InvalidAggregationRule error.
    pub fn invalid_rule(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidAggregationRule {
            index,
            reason: reason.into(),
        }
    }

    /// Create a ConfigError.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether this error is a broken internal contract rather than bad
    /// input. Such errors must reach the caller.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::GridGeometryMismatch { .. })
    }
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let err = AggregationError::GridGeometryMismatch {
            column: 12,
            row: -1,
            columns: 10,
            rows: 10,
        };
        assert_eq!(
            err.to_string(),
            "grid geometry mismatch: cell (column 12, row -1) is outside the 10x10 grid"
        );
        assert!(err.is_contract_violation());
        assert!(!AggregationError::degenerate("pole").is_contract_violation());
    }
}
