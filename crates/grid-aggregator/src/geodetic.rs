//! Metric cell size to degree-space cell size.
//!
//! Uses a spherical earth. Accuracy is well below what a visualization
//! grid can show, and the parallel aggregation path uses the same formula,
//! so it must not be replaced by a geodesic one.

use std::f64::consts::PI;

use crate::types::GridOffset;

/// Earth radius in meters used for the degree conversion.
pub const R_EARTH: f64 = 6_378_000.0;

/// Degrees of latitude spanned by `cell_size_m` meters.
pub fn lat_delta(cell_size_m: f64) -> f64 {
    (cell_size_m / R_EARTH) * (180.0 / PI)
}

/// Degrees of longitude spanned by `cell_size_m` meters at `latitude_deg`.
///
/// Grows without bound towards the poles and is not finite at exactly
/// +/-90 in exact arithmetic; see [`is_degenerate`].
pub fn lon_delta(cell_size_m: f64, latitude_deg: f64) -> f64 {
    lat_delta(cell_size_m) / (latitude_deg * PI / 180.0).cos()
}

/// Degree-space size of a `cell_size_m` cell at `latitude_deg`.
pub fn compute_offset(cell_size_m: f64, latitude_deg: f64) -> GridOffset {
    GridOffset {
        lat_delta: lat_delta(cell_size_m),
        lon_delta: lon_delta(cell_size_m, latitude_deg),
    }
}

/// A geographic offset nothing can be binned with: non-finite, non-positive,
/// or a cell wider than the whole world.
pub fn is_degenerate(offset: &GridOffset) -> bool {
    !offset.is_usable() || offset.lon_delta > 360.0 || offset.lat_delta > 180.0
}
