//! Grid geometry shared by the CPU and parallel aggregation paths.
//!
//! Given a bounding box and a cell size, both paths must land on the same
//! cell boundaries or switching between them shifts every cell on screen.
//! The box's minimum corner is snapped down to a whole number of cells from
//! a fixed world origin; columns and rows then cover the box from there.
//! The result depends on nothing but the box and the cell size.

use grid_common::{AggregationError, BoundingBox, Result};
use serde::{Deserialize, Serialize};

use crate::geodetic;
use crate::hasher::{GEOGRAPHIC_ORIGIN, PROJECTED_ORIGIN};
use crate::types::{CellKey, GridFrame, GridOffset};

/// Coordinate space the grid is laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// Longitude/latitude degrees, metric cell size.
    #[default]
    Geographic,
    /// Output of a projection function, cell size in projected units.
    Projected,
}

impl CoordinateSpace {
    /// Fixed origin cell indices are counted from.
    pub fn world_origin(&self) -> (f64, f64) {
        match self {
            Self::Geographic => GEOGRAPHIC_ORIGIN,
            Self::Projected => PROJECTED_ORIGIN,
        }
    }

    /// Cell size in this space for a box and a requested size.
    pub fn grid_offset(&self, bbox: &BoundingBox, cell_size: f64) -> GridOffset {
        match self {
            Self::Geographic => geodetic::compute_offset(cell_size, bbox.center().1),
            Self::Projected => GridOffset::uniform(cell_size),
        }
    }

    fn is_degenerate(&self, offset: &GridOffset) -> bool {
        match self {
            Self::Geographic => geodetic::is_degenerate(offset),
            Self::Projected => !offset.is_usable(),
        }
    }
}

/// Aligned grid covering a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub space: CoordinateSpace,
    /// Frame whose cell `(0, 0)` contains the box's minimum corner.
    pub frame: GridFrame,
    pub columns: usize,
    pub rows: usize,
}

impl GridGeometry {
    /// Compute the aligned geometry for `bbox` and `cell_size`.
    ///
    /// Fails with `InvalidBbox` for an inverted or non-finite box and with
    /// `DegenerateGeometry` when the cell size cannot be used.
    pub fn compute(bbox: &BoundingBox, cell_size: f64, space: CoordinateSpace) -> Result<Self> {
        if !bbox.is_valid() {
            return Err(AggregationError::InvalidBbox(format!("{bbox:?}")));
        }

        let offset = space.grid_offset(bbox, cell_size);
        if space.is_degenerate(&offset) {
            return Err(AggregationError::degenerate(format!(
                "cell size {cell_size} gives offset {offset:?}"
            )));
        }

        let world = GridFrame::world(space.world_origin(), offset);
        let (min_key, max_key) = match (
            world.key_for(bbox.min_x, bbox.min_y),
            world.key_for(bbox.max_x, bbox.max_y),
        ) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(AggregationError::degenerate(format!(
                    "cell indices of {bbox:?} are not representable"
                )))
            }
        };

        let columns = (max_key.lon_index - min_key.lon_index).unsigned_abs() as usize + 1;
        let rows = (max_key.lat_index - min_key.lat_index).unsigned_abs() as usize + 1;

        Ok(Self {
            space,
            frame: world.aligned_at(min_key),
            columns,
            rows,
        })
    }

    pub fn offset(&self) -> GridOffset {
        self.frame.offset
    }

    /// Lower-left corner of cell `(0, 0)`.
    pub fn origin(&self) -> (f64, f64) {
        self.frame.aligned_origin()
    }

    pub fn cell_count(&self) -> usize {
        self.columns.saturating_mul(self.rows)
    }

    /// Whether `key` addresses a cell of this grid.
    pub fn contains(&self, key: &CellKey) -> bool {
        key.lon_index >= 0
            && key.lat_index >= 0
            && (key.lon_index as u64) < self.columns as u64
            && (key.lat_index as u64) < self.rows as u64
    }

    /// Lower-left corner of a cell.
    pub fn cell_position(&self, key: CellKey) -> (f64, f64) {
        self.frame.cell_position(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projected_geometry() {
        let bbox = BoundingBox::new(12.0, -7.0, 47.0, 3.0);
        let geometry = GridGeometry::compute(&bbox, 10.0, CoordinateSpace::Projected).unwrap();

        assert_eq!(geometry.origin(), (10.0, -10.0));
        assert_eq!(geometry.columns, 4);
        assert_eq!(geometry.rows, 2);
        assert_eq!(geometry.frame.key_for(12.0, -7.0), Some(CellKey::new(0, 0)));
        assert_eq!(geometry.frame.key_for(47.0, 3.0), Some(CellKey::new(1, 3)));
    }

    #[test]
    fn test_geographic_origin_snaps_from_world_corner() {
        let bbox = BoundingBox::new(4.3, 50.8, 4.5, 50.9);
        let geometry = GridGeometry::compute(&bbox, 1000.0, CoordinateSpace::Geographic).unwrap();
        let offset = geometry.offset();
        let (origin_x, origin_y) = geometry.origin();

        let cells_x = (origin_x + 180.0) / offset.lon_delta;
        let cells_y = (origin_y + 90.0) / offset.lat_delta;
        assert!((cells_x - cells_x.round()).abs() < 1e-6);
        assert!((cells_y - cells_y.round()).abs() < 1e-6);
        assert!(origin_x <= bbox.min_x && bbox.min_x - origin_x < offset.lon_delta);
        assert!(origin_y <= bbox.min_y && bbox.min_y - origin_y < offset.lat_delta);
    }

    #[test]
    fn test_point_box_has_one_cell() {
        let bbox = BoundingBox::new(1.0, 1.0, 1.0, 1.0);
        let geometry = GridGeometry::compute(&bbox, 1000.0, CoordinateSpace::Geographic).unwrap();
        assert_eq!((geometry.columns, geometry.rows), (1, 1));
    }

    #[test]
    fn test_polar_box_is_degenerate() {
        let bbox = BoundingBox::new(0.0, 89.9999, 0.0, 89.9999);
        let err = GridGeometry::compute(&bbox, 1000.0, CoordinateSpace::Geographic).unwrap_err();
        assert!(matches!(err, AggregationError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_tiny_cell_size_is_degenerate() {
        let bbox = BoundingBox::new(-1.0, -1.0, 1.0, 1.0);
        let err = GridGeometry::compute(&bbox, 1e-300, CoordinateSpace::Projected).unwrap_err();
        assert!(matches!(err, AggregationError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_inverted_box_rejected() {
        let bbox = BoundingBox::new(5.0, 5.0, 1.0, 1.0);
        let err = GridGeometry::compute(&bbox, 10.0, CoordinateSpace::Projected).unwrap_err();
        assert!(matches!(err, AggregationError::InvalidBbox(_)));
    }

    #[test]
    fn test_contains() {
        let bbox = BoundingBox::new(0.0, 0.0, 29.0, 9.0);
        let geometry = GridGeometry::compute(&bbox, 10.0, CoordinateSpace::Projected).unwrap();
        assert!(geometry.contains(&CellKey::new(0, 2)));
        assert!(!geometry.contains(&CellKey::new(1, 0)));
        assert!(!geometry.contains(&CellKey::new(0, -1)));
        assert_eq!(geometry.cell_count(), 3);
    }
}
