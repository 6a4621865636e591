//! Common test fixtures for grid aggregation tests.
//!
//! This module provides pre-defined extents and hand-placed point sets
//! for the scenarios the aggregation suite checks.

use grid_common::{BoundingBox, Point};

/// Common bounding box definitions for testing, as `(min_x, min_y, max_x, max_y)`.
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// One degree square just north-east of null island
    pub const UNIT_SQUARE: (f64, f64, f64, f64) = (0.0, 0.0, 1.0, 1.0);

    /// Brussels metropolitan area
    pub const BRUSSELS: (f64, f64, f64, f64) = (4.25, 50.76, 4.48, 50.92);

    /// Continental United States bounding box
    pub const CONUS: (f64, f64, f64, f64) = (-130.0, 20.0, -60.0, 55.0);

    /// Single point (degenerate bbox)
    pub const POINT: (f64, f64, f64, f64) = (0.0, 0.0, 0.0, 0.0);

    /// Invalid bbox (min > max)
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 10.0, 5.0, 5.0);
}

/// Build a [`BoundingBox`] from one of the [`bbox`] tuples.
pub fn to_bbox((min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> BoundingBox {
    BoundingBox::new(min_x, min_y, max_x, max_y)
}

/// Cell sizes in meters used across the suite.
pub mod cell_size {
    /// Default cell size
    pub const KILOMETER: f64 = 1000.0;

    /// Large enough to hold two points 0.0001 degrees apart at the equator
    pub const COARSE: f64 = 50_000.0;
}

/// Two points 0.0001 degrees apart at the equator.
pub fn near_pair() -> Vec<Point> {
    vec![Point::new(0.0, 0.0), Point::new(0.0001, 0.0001)]
}

/// A single point close enough to the pole that a kilometer cell is wider
/// than the world.
pub fn polar_point() -> Vec<Point> {
    vec![Point::new(0.0, 89.9999)]
}

/// Points at known offsets inside a 3x2 grid of 10-unit projected cells,
/// with weights. Cell `(row, column)` totals are:
///
/// | row \ column | 0 | 1 | 2 |
/// |---|---|---|---|
/// | 0 | 3.0 (2 points) | - | 4.0 |
/// | 1 | - | 10.0 | 1.0 (3 points) |
pub fn projected_layout() -> Vec<Point> {
    vec![
        Point::weighted(1.0, 1.0, 1.0),
        Point::weighted(25.0, 5.0, 4.0),
        Point::weighted(8.0, 9.0, 2.0),
        Point::weighted(15.0, 15.0, 10.0),
        Point::weighted(21.0, 12.0, 0.5),
        Point::weighted(22.0, 13.0, 0.25),
        Point::weighted(29.0, 19.0, 0.25),
    ]
}
