//! Projection functions used by the projected (screen-space) binning mode.
//!
//! Viewport math lives outside this workspace; the aggregator only needs
//! something that maps `(lng, lat)` to `(x, y)`. Closures work directly:
//!
//! ```
//! use grid_common::Projection;
//!
//! let shift = |lng: f64, lat: f64| (lng + 1.0, lat - 1.0);
//! assert_eq!(shift.project(2.0, 2.0), (3.0, 1.0));
//! ```

use std::f64::consts::PI;

/// Maps a geographic position to projected coordinates.
pub trait Projection {
    fn project(&self, lng: f64, lat: f64) -> (f64, f64);
}

impl<F> Projection for F
where
    F: Fn(f64, f64) -> (f64, f64),
{
    fn project(&self, lng: f64, lat: f64) -> (f64, f64) {
        self(lng, lat)
    }
}

/// Passes coordinates through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Projection for Identity {
    fn project(&self, lng: f64, lat: f64) -> (f64, f64) {
        (lng, lat)
    }
}

/// Spherical Web Mercator (EPSG:3857) in meters.
#[derive(Debug, Clone, Copy)]
pub struct WebMercator {
    /// Sphere radius in meters
    pub radius: f64,
}

impl WebMercator {
    /// WGS84 semi-major axis, as used by EPSG:3857.
    pub const RADIUS: f64 = 6_378_137.0;

    /// Latitude limit of the square Web Mercator world.
    pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

    pub fn new() -> Self {
        Self {
            radius: Self::RADIUS,
        }
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new()
    }
}

impl Projection for WebMercator {
    fn project(&self, lng: f64, lat: f64) -> (f64, f64) {
        // NaN survives clamp(), so invalid input stays invalid
        let lat = lat.clamp(-Self::MAX_LATITUDE, Self::MAX_LATITUDE);
        let x = self.radius * lng.to_radians();
        let y = self.radius * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }
}
