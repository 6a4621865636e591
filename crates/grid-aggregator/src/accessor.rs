//! Position and value extraction from caller records.

use grid_common::{Point, Position};

/// Resolves the fields the aggregator needs from an opaque record.
pub trait PointAccessor<T> {
    /// Position of the record. Non-finite components mark it invalid.
    fn position(&self, record: &T) -> Position;

    /// Value reduced by weight-based aggregation rules.
    ///
    /// `None` means the record cannot be valued, which aborts the
    /// aggregation as a configuration error.
    fn weight(&self, _record: &T) -> Option<f64> {
        Some(1.0)
    }
}

/// Accessor for the workspace's own [`Point`] and [`Position`] types.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointFields;

impl PointAccessor<Point> for PointFields {
    fn position(&self, record: &Point) -> Position {
        record.position
    }

    fn weight(&self, record: &Point) -> Option<f64> {
        Some(record.weight)
    }
}

impl PointAccessor<Position> for PointFields {
    fn position(&self, record: &Position) -> Position {
        *record
    }
}

/// Accessor built from a pair of closures.
pub struct FnAccessor<P, W> {
    position: P,
    weight: W,
}

impl<P, W> FnAccessor<P, W> {
    pub fn new(position: P, weight: W) -> Self {
        Self { position, weight }
    }
}

impl<T, P, W> PointAccessor<T> for FnAccessor<P, W>
where
    P: Fn(&T) -> Position,
    W: Fn(&T) -> Option<f64>,
{
    fn position(&self, record: &T) -> Position {
        (self.position)(record)
    }

    fn weight(&self, record: &T) -> Option<f64> {
        (self.weight)(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Station {
        coords: [f64; 2],
        rain_mm: Option<f64>,
    }

    #[test]
    fn test_fn_accessor() {
        let accessor = FnAccessor::new(
            |s: &Station| Position::new(s.coords[0], s.coords[1]),
            |s: &Station| s.rain_mm,
        );
        let wet = Station {
            coords: [4.0, 50.0],
            rain_mm: Some(2.5),
        };
        let broken = Station {
            coords: [4.0, 50.0],
            rain_mm: None,
        };

        assert_eq!(accessor.position(&wet), Position::new(4.0, 50.0));
        assert_eq!(accessor.weight(&wet), Some(2.5));
        assert_eq!(accessor.weight(&broken), None);
    }

    #[test]
    fn test_position_records_have_unit_weight() {
        assert_eq!(PointFields.weight(&Position::new(1.0, 2.0)), Some(1.0));
        assert_eq!(PointFields.weight(&Point::weighted(1.0, 2.0, 7.0)), Some(7.0));
    }
}
