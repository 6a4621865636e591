//! Point observation types.

use serde::{Deserialize, Serialize};

/// A geographic position. Longitude and latitude are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lng: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl Position {
    /// Create a 2D position.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            lng,
            lat,
            elevation: None,
        }
    }

    /// Create a 3D position.
    pub fn with_elevation(lng: f64, lat: f64, elevation: f64) -> Self {
        Self {
            lng,
            lat,
            elevation: Some(elevation),
        }
    }

    /// Both horizontal components are finite. Elevation is not checked;
    /// it does not take part in binning.
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl From<(f64, f64)> for Position {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self::new(lng, lat)
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A weighted point observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub position: Position,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Point {
    /// A point with unit weight.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            position: Position::new(lng, lat),
            weight: 1.0,
        }
    }

    /// A point with an explicit weight.
    pub fn weighted(lng: f64, lat: f64, weight: f64) -> Self {
        Self {
            position: Position::new(lng, lat),
            weight,
        }
    }
}
