//! Metric Grid Aggregation of Point Observations
//!
//! This crate bins point observations into a grid whose cells have a fixed
//! size in meters and reduces each occupied cell to a value. It produces:
//!
//! - **Sparse output**: a hash of occupied cells with their member indices,
//!   for picking and CPU-side drawing
//! - **Dense output**: a fixed-stride `f32` buffer for texture upload, laid
//!   out exactly like the parallel aggregation path expects
//! - **Statistics**: min/max/total and percentile domains for color scales
//!
//! # Architecture
//!
//! ```text
//! AggregationOrchestrator::update(input, changes)
//!      │
//!      ├─► Clean: return cached Arc<AggregationResult>
//!      │
//!      └─► Dirty:
//!            │
//!            ├─► GridGeometry::compute(bbox, cell_size)
//!            │         (geodetic offset, aligned origin, columns x rows)
//!            │
//!            ├─► hash_points ──► GridHash (sparse, creation-ordered)
//!            │
//!            ├─► BinAggregator ──► SortedBins + min/max/total
//!            │
//!            └─► DenseGridWriter ──► DenseAggregationBuffer + summaries
//! ```
//!
//! # Example
//!
//! ```
//! use grid_aggregator::{
//!     AggregationInput, AggregationOrchestrator, AggregatorConfig, ChangeFlags, PointFields,
//! };
//! use grid_common::Point;
//!
//! let points = vec![Point::new(4.35, 50.85), Point::new(4.351, 50.851)];
//! let mut orchestrator = AggregationOrchestrator::new(AggregatorConfig::default())?;
//!
//! let input = AggregationInput::new(&points, &PointFields);
//! let result = orchestrator.update(&input, &ChangeFlags::data())?;
//! assert_eq!(result.total_count, 2);
//!
//! // Nothing changed: the cached result comes back
//! let again = orchestrator.update(&input, &ChangeFlags::none())?;
//! assert!(std::sync::Arc::ptr_eq(&result, &again));
//! # Ok::<(), grid_common::AggregationError>(())
//! ```

pub mod accessor;
pub mod bins;
pub mod config;
pub mod dense;
pub mod geodetic;
pub mod geometry;
pub mod hasher;
pub mod orchestrator;
pub mod picking;
pub mod result;
pub mod types;

// Re-export commonly used types at crate root
pub use accessor::{FnAccessor, PointAccessor, PointFields};
pub use bins::{AggregationRule, Bin, BinAggregator, SortedBins};
pub use config::AggregatorConfig;
pub use dense::{linear_index, DenseAggregationBuffer, DenseGridWriter, SummaryRecords, DEFAULT_STRIDE};
pub use geodetic::{compute_offset, R_EARTH};
pub use geometry::{CoordinateSpace, GridGeometry};
pub use hasher::{hash_points, HashOptions, HashedGrid, ProjectionMode};
pub use orchestrator::{
    AccessorKind, AggregationInput, AggregationOrchestrator, AggregationProps, AggregationState,
    ChangeFlags, DirtyReason, UpdateTriggers,
};
pub use picking::{CellPicker, PickedCell};
pub use result::{AggregationResult, AggregationSummary};
pub use types::{CellKey, GridCell, GridFrame, GridHash, GridOffset, MAX_CELL_INDEX};

pub use grid_common::{AggregationError, BoundingBox, Point, Position, Projection, Result};
