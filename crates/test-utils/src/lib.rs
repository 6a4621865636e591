//! Shared test utilities for the grid aggregation workspace.
//!
//! Points are generated from explicit seeds, so a failing property test
//! reproduces on every machine. Fixtures hold the hand-placed layouts whose
//! per-cell totals the aggregation tests assert on.

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Assert two floats are within `epsilon` of each other. NaN never passes.
///
/// ```
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(0.0089833_f64, 0.008983345_f64, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "assertion failed: `{} ≈ {}`: {:?} vs {:?}, diff {:?} > {:?}",
            stringify!($left),
            stringify!($right),
            left,
            right,
            diff,
            epsilon
        );
    }};
}

/// Assert an `(x, y)` pair lies within `epsilon` of another on both axes.
///
/// ```
/// use test_utils::assert_xy_approx_eq;
///
/// assert_xy_approx_eq!((-180.0 + 1e-12, -90.0), (-180.0, -90.0), 1e-9);
/// ```
#[macro_export]
macro_rules! assert_xy_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right): ((f64, f64), (f64, f64)) = ($left, $right);
        $crate::assert_approx_eq!(left.0, right.0, $epsilon);
        $crate::assert_approx_eq!(left.1, right.1, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_rejects_nan() {
        assert_approx_eq!(f64::NAN, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_xy_checks_second_axis() {
        assert_xy_approx_eq!((1.0, 2.0), (1.0, 2.5), 0.1);
    }
}
