//! Tests for BoundingBox parsing and geometry helpers.

use grid_common::bbox::{BboxParseError, BoundingBox};

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_integer_bbox() {
    let bbox: BoundingBox = "0,0,100,100".parse().unwrap();
    assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn test_parse_with_whitespace() {
    let bbox = BoundingBox::parse(" -10.5, 20 ,  30.25,40 ").unwrap();
    assert_eq!(bbox, BoundingBox::new(-10.5, 20.0, 30.25, 40.0));
}

#[test]
fn test_parse_scientific_notation() {
    let bbox = BoundingBox::parse("1e-6,2e-6,1e6,2e6").unwrap();
    assert!((bbox.min_x - 1e-6).abs() < 1e-12);
    assert!((bbox.max_y - 2e6).abs() < 1e-6);
}

#[test]
fn test_parse_wrong_arity() {
    let err = BoundingBox::parse("1,2,3").unwrap_err();
    assert!(matches!(err, BboxParseError::InvalidFormat(_)));
}

#[test]
fn test_parse_bad_number() {
    let err = BoundingBox::parse("1,2,three,4").unwrap_err();
    match err {
        BboxParseError::InvalidNumber(part) => assert_eq!(part, "three"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_parse_inverted() {
    let err = BoundingBox::parse("10,10,5,5").unwrap_err();
    assert!(matches!(err, BboxParseError::Inverted(_)));
}

// ============================================================================
// Geometry
// ============================================================================

#[test]
fn test_dimensions_and_center() {
    let bbox = BoundingBox::new(-2.0, 10.0, 6.0, 14.0);
    assert_eq!(bbox.width(), 8.0);
    assert_eq!(bbox.height(), 4.0);
    assert_eq!(bbox.center(), (2.0, 12.0));
}

#[test]
fn test_include_grows_box() {
    let mut bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    bbox.include(-1.0, 3.0);
    assert_eq!(bbox, BoundingBox::new(-1.0, 0.0, 1.0, 3.0));
}

#[test]
fn test_contains_point_edges() {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    assert!(bbox.contains_point(0.0, 0.0));
    assert!(bbox.contains_point(10.0, 10.0));
    assert!(!bbox.contains_point(10.001, 5.0));
}

#[test]
fn test_single_point_box_is_valid() {
    let bbox = BoundingBox::from_coords(vec![(3.0, 4.0)]).unwrap();
    assert!(bbox.is_valid());
    assert_eq!(bbox.width(), 0.0);
    assert_eq!(bbox.height(), 0.0);
}
