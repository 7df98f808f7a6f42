// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use ngcvm::{BoundingBox, ControllerSnapshot, ErrorPolicy, ParserConfig, Point3, Program};

fn extents(src: &str) -> BoundingBox {
    let program = Program::load(src, &ControllerSnapshot::default(), &ParserConfig::default(),
                                ErrorPolicy::Abort).unwrap();
    let (bbox, issues) = program.extents();
    assert!(issues.is_empty(), "{:?}", issues);
    bbox
}

fn assert_box(bbox: &BoundingBox, min: (f64, f64, f64), max: (f64, f64, f64)) {
    let close = |a: f64, b: f64| (a - b).abs() < 1e-6;
    assert!(close(bbox.min.x, min.0) && close(bbox.min.y, min.1) && close(bbox.min.z, min.2) &&
            close(bbox.max.x, max.0) && close(bbox.max.y, max.1) && close(bbox.max.z, max.2),
            "unexpected extents\n{}", bbox);
}

#[test]
fn test_lines() {
    let bbox = extents("G0 X10 Y-2\nG1 X-3 Y4 F100");
    assert_box(&bbox, (-3., -2., 0.), (10., 4., 0.));
    assert_eq!(bbox.size, Point3::new(13., 6., 0.));
}

#[test]
fn test_arc_quadrants() {
    // clockwise half circle above the chord
    let bbox = extents("G0 X0 Y0\nG2 X10 Y0 I5 J0 F100");
    assert_box(&bbox, (0., 0., 0.), (10., 5., 0.));
    // counterclockwise half circle below the chord
    let bbox = extents("G0 X0 Y0\nG3 X10 Y0 I5 J0 F100");
    assert_box(&bbox, (0., -5., 0.), (10., 0., 0.));
    // full circle
    let bbox = extents("G0 X0 Y0\nG2 X0 Y0 I5 J0 F100");
    assert_box(&bbox, (0., -5., 0.), (10., 5., 0.));
    // quarter circle crossing no quadrant boundary
    let bbox = extents("G0 X5 Y0\nG3 X0 Y5 I-5 J0 F100");
    assert_box(&bbox, (0., 0., 0.), (5., 5., 0.));
}

#[test]
fn test_helix_and_planes() {
    let bbox = extents("G0 X0 Y0 Z0\nG2 X10 Y0 Z-5 I5 J0 F100");
    assert_box(&bbox, (0., 0., -5.), (10., 5., 0.));
    let bbox = extents("G18\nG0 X0 Z0\nG2 X10 Z0 I5 K0 F100");
    assert_box(&bbox, (0., 0., -5.), (10., 0., 0.));
}

#[test]
fn test_spline() {
    let bbox = extents("G5.1 X10 I5 J10 F100");
    assert!((bbox.max.y - 5.).abs() < 0.01, "{}", bbox);
    assert_eq!(bbox.min.y, 0.);
    assert_eq!(bbox.max.x, 10.);
}

#[test]
fn test_machine_moves_excluded() {
    let bbox = extents("G53 G0 X100 Y100");
    assert_box(&bbox, (0., 0., 0.), (0., 0., 0.));
    assert_eq!(bbox.size, Point3::default());
}

#[test]
fn test_reducer() {
    let mut bbox = BoundingBox::new();
    assert!(bbox.is_empty());
    bbox.add_point(Point3::new(1., 2., 3.));
    assert!(!bbox.is_empty());
    let mut other = BoundingBox::new();
    other.add_point(Point3::new(-1., 5., 3.));
    bbox.add_bounding_box(&other);
    bbox.add_bounding_box(&BoundingBox::new());
    bbox.conclude();
    assert_box(&bbox, (-1., 2., 3.), (1., 5., 3.));
    assert_eq!(bbox.size, Point3::new(2., 3., 0.));
    assert_eq!(bbox.to_string().lines().count(), 3);
    bbox.reset();
    assert!(bbox.is_empty());
}
