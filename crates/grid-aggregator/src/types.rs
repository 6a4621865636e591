//! Core types for grid aggregation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Size of one grid cell in source coordinates.
///
/// In geographic space this is degrees (derived from a metric cell size);
/// in projected space it is projected units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridOffset {
    pub lat_delta: f64,
    pub lon_delta: f64,
}

impl GridOffset {
    pub fn new(lat_delta: f64, lon_delta: f64) -> Self {
        Self {
            lat_delta,
            lon_delta,
        }
    }

    /// Square cells of `size` units on both axes.
    pub fn uniform(size: f64) -> Self {
        Self::new(size, size)
    }

    /// Both deltas finite and strictly positive, so they can be divided by.
    pub fn is_usable(&self) -> bool {
        self.lat_delta.is_finite()
            && self.lon_delta.is_finite()
            && self.lat_delta > 0.0
            && self.lon_delta > 0.0
    }
}

/// Integer address of a grid cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct CellKey {
    pub lat_index: i64,
    pub lon_index: i64,
}

impl CellKey {
    pub fn new(lat_index: i64, lon_index: i64) -> Self {
        Self {
            lat_index,
            lon_index,
        }
    }
}

/// Accumulator for the points falling into one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub key: CellKey,
    pub count: u32,
    /// Indices into the record slice that was hashed.
    pub member_indices: Vec<usize>,
    /// Creation order among the cells of one hash.
    pub index: usize,
}

impl GridCell {
    pub fn new(key: CellKey, index: usize) -> Self {
        Self {
            key,
            count: 0,
            member_indices: Vec::new(),
            index,
        }
    }

    pub fn push(&mut self, member: usize) {
        self.count += 1;
        self.member_indices.push(member);
    }
}

/// Sparse mapping from occupied cells to their members.
pub type GridHash = HashMap<CellKey, GridCell>;

/// Largest world cell index, 2^53. Integer cell indices stay exact in `f64`
/// up to here.
pub const MAX_CELL_INDEX: f64 = 9_007_199_254_740_992.0;

/// Maps coordinates to cell keys.
///
/// Keys are computed from a fixed world origin, then shifted by an integer
/// number of cells. Two frames with the same origin and offset therefore
/// share every cell boundary, whatever their shift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridFrame {
    /// World origin x (longitude or projected x)
    pub origin_x: f64,
    /// World origin y (latitude or projected y)
    pub origin_y: f64,
    pub offset: GridOffset,
    /// Subtracted from world keys
    pub shift: CellKey,
}

impl GridFrame {
    /// Frame addressing cells directly from the world origin.
    pub fn world(origin: (f64, f64), offset: GridOffset) -> Self {
        Self {
            origin_x: origin.0,
            origin_y: origin.1,
            offset,
            shift: CellKey::default(),
        }
    }

    /// Same boundaries, with `key` (a world key) becoming `(0, 0)`.
    pub fn aligned_at(&self, key: CellKey) -> Self {
        Self {
            shift: CellKey::new(
                self.shift.lat_index + key.lat_index,
                self.shift.lon_index + key.lon_index,
            ),
            ..*self
        }
    }

    /// Key of the cell containing `(x, y)`.
    ///
    /// `None` for non-finite input, and for world indices beyond
    /// [`MAX_CELL_INDEX`] where `f64` can no longer tell cells apart.
    pub fn key_for(&self, x: f64, y: f64) -> Option<CellKey> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let lat = ((y - self.origin_y) / self.offset.lat_delta).floor();
        let lon = ((x - self.origin_x) / self.offset.lon_delta).floor();
        if !(lat.abs() <= MAX_CELL_INDEX && lon.abs() <= MAX_CELL_INDEX) {
            return None;
        }
        Some(CellKey::new(
            (lat as i64).checked_sub(self.shift.lat_index)?,
            (lon as i64).checked_sub(self.shift.lon_index)?,
        ))
    }

    /// Lower-left corner of a cell as `(x, y)`.
    pub fn cell_position(&self, key: CellKey) -> (f64, f64) {
        let lon = (key.lon_index + self.shift.lon_index) as f64;
        let lat = (key.lat_index + self.shift.lat_index) as f64;
        (
            self.origin_x + lon * self.offset.lon_delta,
            self.origin_y + lat * self.offset.lat_delta,
        )
    }

    /// Lower-left corner of cell `(0, 0)`.
    pub fn aligned_origin(&self) -> (f64, f64) {
        self.cell_position(CellKey::default())
    }
}
