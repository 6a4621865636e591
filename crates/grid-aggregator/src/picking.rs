//! Hit-testing of aggregated cells.

use std::sync::{Arc, Weak};

use serde::Serialize;

use crate::result::AggregationResult;
use crate::types::CellKey;

/// Information about the cell under a picked coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickedCell {
    pub key: CellKey,
    pub count: u32,
    pub value: Option<f64>,
    /// Lower-left corner of the cell in grid space.
    pub position: (f64, f64),
    pub member_indices: Vec<usize>,
}

struct Memo {
    result: Weak<AggregationResult>,
    key: CellKey,
    picked: PickedCell,
}

/// Picks cells of an [`AggregationResult`], remembering the last pick.
///
/// Hovering usually stays within one cell for many events; the memo
/// answers those without cloning the member list again. It holds only a
/// weak reference, so a replaced result is released normally.
#[derive(Default)]
pub struct CellPicker {
    memo: Option<Memo>,
    hits: u64,
}

impl CellPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell containing `(x, y)`, given in the result's grid space
    /// (longitude/latitude, or projected coordinates).
    pub fn pick(&mut self, result: &Arc<AggregationResult>, x: f64, y: f64) -> Option<PickedCell> {
        let geometry = result.geometry?;
        let key = geometry.frame.key_for(x, y)?;

        if let Some(memo) = &self.memo {
            if memo.key == key && std::ptr::eq(memo.result.as_ptr(), Arc::as_ptr(result)) {
                self.hits += 1;
                return Some(memo.picked.clone());
            }
        }

        let cell = result.cell(&key)?;
        let picked = PickedCell {
            key,
            count: cell.count,
            value: result.bins.get(&key).map(|b| b.value),
            position: geometry.cell_position(key),
            member_indices: cell.member_indices.clone(),
        };

        self.memo = Some(Memo {
            result: Arc::downgrade(result),
            key,
            picked: picked.clone(),
        });
        Some(picked)
    }

    /// Picks answered from the memo.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn clear(&mut self) {
        self.memo = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::PointFields;
    use crate::bins::AggregationRule;
    use crate::config::AggregatorConfig;
    use crate::geometry::CoordinateSpace;
    use crate::orchestrator::{AggregationInput, AggregationOrchestrator, AggregationProps, ChangeFlags};
    use grid_common::{Identity, Point};

    fn aggregate(points: &[Point]) -> Arc<AggregationResult> {
        let mut orch = AggregationOrchestrator::new(AggregatorConfig::default()).unwrap();
        let props = AggregationProps::default()
            .with_space(CoordinateSpace::Projected)
            .with_cell_size(10.0)
            .with_rule(AggregationRule::Sum);
        orch.set_props(props).unwrap();
        let input = AggregationInput::new(points, &PointFields).with_projection(&Identity);
        orch.update(&input, &ChangeFlags::none()).unwrap()
    }

    #[test]
    fn test_pick_cell() {
        let points = vec![
            Point::weighted(1.0, 1.0, 2.0),
            Point::weighted(25.0, 1.0, 5.0),
            Point::weighted(3.0, 4.0, 1.5),
        ];
        let result = aggregate(&points);
        let mut picker = CellPicker::new();

        let picked = picker.pick(&result, 5.0, 5.0).unwrap();
        assert_eq!(picked.key, CellKey::new(0, 0));
        assert_eq!(picked.count, 2);
        assert_eq!(picked.value, Some(3.5));
        assert_eq!(picked.position, (0.0, 0.0));
        assert_eq!(picked.member_indices, vec![0, 2]);

        // empty cell between the two occupied ones
        assert_eq!(picker.pick(&result, 15.0, 5.0), None);
        assert_eq!(picker.pick(&result, f64::NAN, 5.0), None);
    }

    #[test]
    fn test_memo_reused_within_cell() {
        let points = vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)];
        let result = aggregate(&points);
        let mut picker = CellPicker::new();

        let first = picker.pick(&result, 1.0, 1.0).unwrap();
        let second = picker.pick(&result, 9.0, 9.0).unwrap();
        assert_eq!(first, second);
        assert_eq!(picker.hits(), 1);

        // a different result never reuses the memo
        let other = aggregate(&points);
        picker.pick(&other, 1.0, 1.0).unwrap();
        assert_eq!(picker.hits(), 1);

        picker.clear();
        picker.pick(&other, 1.0, 1.0).unwrap();
        assert_eq!(picker.hits(), 1);
    }

    #[test]
    fn test_empty_result_picks_nothing() {
        let result = Arc::new(AggregationResult::empty(AggregationRule::Count, 4));
        assert_eq!(CellPicker::new().pick(&result, 0.0, 0.0), None);
    }
}
