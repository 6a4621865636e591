//! Common types shared across the grid aggregation workspace.

pub mod bbox;
pub mod error;
pub mod point;
pub mod projection;

pub use bbox::{BboxParseError, BoundingBox};
pub use error::{AggregationError, Result};
pub use point::{Point, Position};
pub use projection::{Identity, Projection, WebMercator};
