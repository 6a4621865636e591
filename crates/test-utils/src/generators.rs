//! Seeded point generators.
//!
//! Every generator takes an explicit seed so tests and benchmarks see the
//! same points on every run.

use grid_common::{BoundingBox, Point, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Points spread uniformly over `bbox`, all with weight 1.
///
/// # Example
///
/// ```
/// use grid_common::BoundingBox;
/// use test_utils::uniform_points;
///
/// let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
/// let points = uniform_points(100, &bbox, 7);
/// assert_eq!(points.len(), 100);
/// assert!(points.iter().all(|p| bbox.contains_point(p.position.lng, p.position.lat)));
/// ```
pub fn uniform_points(count: usize, bbox: &BoundingBox, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Point::new(sample(&mut rng, bbox.min_x, bbox.max_x), sample(&mut rng, bbox.min_y, bbox.max_y)))
        .collect()
}

/// Uniform points with weights drawn from `[min_weight, max_weight)`.
pub fn weighted_points(count: usize, bbox: &BoundingBox, min_weight: f64, max_weight: f64, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let lng = sample(&mut rng, bbox.min_x, bbox.max_x);
            let lat = sample(&mut rng, bbox.min_y, bbox.max_y);
            Point::weighted(lng, lat, sample(&mut rng, min_weight, max_weight))
        })
        .collect()
}

/// Points gathered around `centers`, at most `spread` degrees away on
/// each axis.
pub fn clustered_points(centers: &[(f64, f64)], per_cluster: usize, spread: f64, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(centers.len() * per_cluster);
    for &(lng, lat) in centers {
        for _ in 0..per_cluster {
            let dx = sample(&mut rng, -spread, spread);
            let dy = sample(&mut rng, -spread, spread);
            points.push(Point::new(lng + dx, lat + dy));
        }
    }
    points
}

/// Insert a record with a non-finite position after every `every`-th point.
///
/// Cycles through NaN and infinite longitudes and latitudes so each kind
/// of invalid coordinate is exercised.
pub fn with_invalid_points(points: Vec<Point>, every: usize) -> Vec<Point> {
    let invalid = [
        Position::new(f64::NAN, 0.0),
        Position::new(0.0, f64::NAN),
        Position::new(f64::INFINITY, 10.0),
        Position::new(10.0, f64::NEG_INFINITY),
    ];

    let every = every.max(1);
    let mut out = Vec::with_capacity(points.len() + points.len() / every);
    for (i, point) in points.into_iter().enumerate() {
        out.push(point);
        if (i + 1) % every == 0 {
            let position = invalid[(i / every) % invalid.len()];
            out.push(Point {
                position,
                weight: 1.0,
            });
        }
    }
    out
}

/// Number of records in `points` with a finite position.
pub fn finite_count(points: &[Point]) -> usize {
    points.iter().filter(|p| p.position.is_finite()).count()
}

fn sample(rng: &mut StdRng, min: f64, max: f64) -> f64 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}
