//! Point to grid-cell hashing.
//!
//! Two passes over the records:
//!
//! 1. In geographic mode without a supplied frame, scan the finite
//!    latitudes and derive one global cell size at the midpoint latitude.
//!    The metric size of a cell therefore drifts slightly away from that
//!    latitude. The parallel path makes the same approximation.
//! 2. Bin every record with a finite position into a lazily created
//!    [`GridCell`]. Invalid positions are counted and skipped.
//!
//! Memory is proportional to the number of occupied cells, not to the
//! extent of the grid.

use grid_common::Projection;

use crate::accessor::PointAccessor;
use crate::geodetic;
use crate::types::{GridCell, GridFrame, GridHash, GridOffset};

/// World origin of geographic cell indices (longitude, latitude).
pub const GEOGRAPHIC_ORIGIN: (f64, f64) = (-180.0, -90.0);

/// World origin of projected cell indices.
pub const PROJECTED_ORIGIN: (f64, f64) = (0.0, 0.0);

/// How record positions are mapped into grid space.
#[derive(Clone, Copy, Default)]
pub enum ProjectionMode<'a> {
    /// Bin raw longitude/latitude with a geodetic cell size.
    #[default]
    Geographic,
    /// Project each position first; the cell size is in projected units.
    Projected(&'a dyn Projection),
}

impl std::fmt::Debug for ProjectionMode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geographic => write!(f, "Geographic"),
            Self::Projected(_) => write!(f, "Projected"),
        }
    }
}

impl ProjectionMode<'_> {
    /// Map a position into grid space.
    pub fn apply(&self, lng: f64, lat: f64) -> (f64, f64) {
        match self {
            Self::Geographic => (lng, lat),
            Self::Projected(projection) => projection.project(lng, lat),
        }
    }
}

/// Parameters of one hashing pass.
#[derive(Debug, Clone, Copy)]
pub struct HashOptions<'a> {
    /// Meters in geographic mode, projected units otherwise.
    pub cell_size: f64,
    pub mode: ProjectionMode<'a>,
    /// Precomputed frame. Skips the latitude scan and makes indices
    /// relative to the frame's aligned origin.
    pub frame: Option<GridFrame>,
}

impl<'a> HashOptions<'a> {
    pub fn geographic(cell_size: f64) -> Self {
        Self {
            cell_size,
            mode: ProjectionMode::Geographic,
            frame: None,
        }
    }

    pub fn projected(cell_size: f64, projection: &'a dyn Projection) -> Self {
        Self {
            cell_size,
            mode: ProjectionMode::Projected(projection),
            frame: None,
        }
    }

    pub fn with_frame(mut self, frame: GridFrame) -> Self {
        self.frame = Some(frame);
        self
    }
}

/// Output of [`hash_points`].
#[derive(Debug, Clone)]
pub struct HashedGrid {
    pub grid_hash: GridHash,
    pub grid_offset: GridOffset,
    /// Frame the keys were computed in.
    pub frame: GridFrame,
    /// Records skipped for a non-finite position.
    pub dropped: usize,
    /// The offset could not be used; nothing was binned.
    pub degenerate: bool,
}

impl HashedGrid {
    fn degenerate(frame: GridFrame) -> Self {
        Self {
            grid_hash: GridHash::new(),
            grid_offset: frame.offset,
            frame,
            dropped: 0,
            degenerate: true,
        }
    }

    /// Sum of all cell counts.
    pub fn total_count(&self) -> u64 {
        self.grid_hash.values().map(|c| u64::from(c.count)).sum()
    }
}

/// Find the latitude range of all finite latitudes.
pub(crate) fn latitude_range<T, A: PointAccessor<T>>(records: &[T], accessor: &A) -> Option<(f64, f64)> {
    let mut range: Option<(f64, f64)> = None;
    for record in records {
        let lat = accessor.position(record).lat;
        if !lat.is_finite() {
            continue;
        }
        range = Some(match range {
            Some((min, max)) => (min.min(lat), max.max(lat)),
            None => (lat, lat),
        });
    }
    range
}

/// Resolve the frame for a hashing pass.
fn resolve_frame<T, A: PointAccessor<T>>(
    records: &[T],
    accessor: &A,
    options: &HashOptions<'_>,
) -> (GridFrame, bool) {
    if let Some(frame) = options.frame {
        let usable = match options.mode {
            ProjectionMode::Geographic => !geodetic::is_degenerate(&frame.offset),
            ProjectionMode::Projected(_) => frame.offset.is_usable(),
        };
        return (frame, usable);
    }

    match options.mode {
        ProjectionMode::Geographic => {
            let center_lat = match latitude_range(records, accessor) {
                Some((min, max)) => (min + max) / 2.0,
                None => f64::NAN,
            };
            let offset = geodetic::compute_offset(options.cell_size, center_lat);
            let usable = !geodetic::is_degenerate(&offset);
            (GridFrame::world(GEOGRAPHIC_ORIGIN, offset), usable)
        }
        ProjectionMode::Projected(_) => {
            let offset = GridOffset::uniform(options.cell_size);
            (GridFrame::world(PROJECTED_ORIGIN, offset), offset.is_usable())
        }
    }
}

/// Bin records into a sparse grid.
///
/// Records are borrowed; cells keep indices into `records`. A degenerate
/// cell size yields an empty hash with `degenerate` set.
pub fn hash_points<T, A>(records: &[T], accessor: &A, options: &HashOptions<'_>) -> HashedGrid
where
    A: PointAccessor<T>,
{
    let (frame, usable) = resolve_frame(records, accessor, options);
    if !usable {
        tracing::debug!(
            cell_size = options.cell_size,
            lat_delta = frame.offset.lat_delta,
            lon_delta = frame.offset.lon_delta,
            "Degenerate grid offset, skipping binning"
        );
        return HashedGrid::degenerate(frame);
    }

    let mut grid_hash = GridHash::new();
    let mut dropped = 0usize;

    for (i, record) in records.iter().enumerate() {
        let position = accessor.position(record);
        if !position.is_finite() {
            dropped += 1;
            continue;
        }

        let (x, y) = options.mode.apply(position.lng, position.lat);
        let key = match frame.key_for(x, y) {
            Some(key) => key,
            None => {
                dropped += 1;
                continue;
            }
        };

        let next_index = grid_hash.len();
        grid_hash
            .entry(key)
            .or_insert_with(|| GridCell::new(key, next_index))
            .push(i);
    }

    tracing::debug!(
        mode = ?options.mode,
        records = records.len(),
        cells = grid_hash.len(),
        dropped,
        "Hashed points into grid"
    );

    HashedGrid {
        grid_hash,
        grid_offset: frame.offset,
        frame,
        dropped,
        degenerate: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::PointFields;
    use crate::types::CellKey;
    use grid_common::{Point, Position};

    #[test]
    fn test_geographic_origin_is_world_corner() {
        let points = vec![Point::new(-180.0, -90.0)];
        // Single point at the south pole: midpoint latitude is -90
        let hashed = hash_points(&points, &PointFields, &HashOptions::geographic(1000.0));
        assert!(hashed.degenerate);

        let points = vec![Point::new(-179.9999, 0.0), Point::new(0.0, 0.0)];
        let hashed = hash_points(&points, &PointFields, &HashOptions::geographic(1000.0));
        assert!(!hashed.degenerate);
        assert!(hashed.grid_hash.contains_key(&CellKey::new(
            (90.0 / hashed.grid_offset.lat_delta).floor() as i64,
            0
        )));
    }

    #[test]
    fn test_members_are_indices() {
        let points = vec![
            Point::new(10.0, 10.0),
            Point::new(f64::NAN, 10.0),
            Point::new(10.000001, 10.000001),
        ];
        let hashed = hash_points(&points, &PointFields, &HashOptions::geographic(5000.0));

        assert_eq!(hashed.dropped, 1);
        assert_eq!(hashed.grid_hash.len(), 1);
        let cell = hashed.grid_hash.values().next().unwrap();
        assert_eq!(cell.count, 2);
        assert_eq!(cell.member_indices, vec![0, 2]);
    }

    #[test]
    fn test_projected_mode_uses_projection_and_zero_origin() {
        let double = |lng: f64, lat: f64| (lng * 2.0, lat * 2.0);
        let points = vec![Position::new(1.0, 1.0), Position::new(4.0, -1.0)];
        let hashed = hash_points(&points, &PointFields, &HashOptions::projected(5.0, &double));

        assert_eq!(hashed.grid_offset, GridOffset::uniform(5.0));
        assert!(hashed.grid_hash.contains_key(&CellKey::new(0, 0)));
        assert!(hashed.grid_hash.contains_key(&CellKey::new(-1, 1)));
    }

    #[test]
    fn test_projection_producing_nan_drops_point() {
        let clip = |lng: f64, lat: f64| if lng > 0.0 { (f64::NAN, lat) } else { (lng, lat) };
        let points = vec![Position::new(-1.0, 0.0), Position::new(1.0, 0.0)];
        let hashed = hash_points(&points, &PointFields, &HashOptions::projected(1.0, &clip));

        assert_eq!(hashed.dropped, 1);
        assert_eq!(hashed.total_count(), 1);
    }

    #[test]
    fn test_cells_record_creation_order() {
        let points = vec![
            Position::new(0.5, 0.5),
            Position::new(5.5, 0.5),
            Position::new(0.6, 0.6),
            Position::new(9.5, 9.5),
        ];
        let identity = grid_common::Identity;
        let hashed = hash_points(&points, &PointFields, &HashOptions::projected(1.0, &identity));

        assert_eq!(hashed.grid_hash[&CellKey::new(0, 0)].index, 0);
        assert_eq!(hashed.grid_hash[&CellKey::new(0, 5)].index, 1);
        assert_eq!(hashed.grid_hash[&CellKey::new(9, 9)].index, 2);
    }

    #[test]
    fn test_empty_input_is_degenerate() {
        let points: Vec<Point> = Vec::new();
        let hashed = hash_points(&points, &PointFields, &HashOptions::geographic(1000.0));
        assert!(hashed.degenerate);
        assert!(hashed.grid_hash.is_empty());
        assert_eq!(hashed.total_count(), 0);
    }

    #[test]
    fn test_non_positive_projected_cell_size() {
        let identity = grid_common::Identity;
        let points = vec![Position::new(1.0, 1.0)];
        let hashed = hash_points(&points, &PointFields, &HashOptions::projected(0.0, &identity));
        assert!(hashed.degenerate);
    }
}
