// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Plane geometry for arcs and Bézier splines.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::axes::Point3;

/// Largest distance by which an endpoint may miss the arc circle (mm).
pub const ARC_TOLERANCE: f64 = 0.002;

/// Distances below this are considered zero.
pub const EPSILON: f64 = 1e-9;

/// Find the center of an arc from `start` to `end` (in plane coordinates)
/// with the given radius.  A negative radius selects the arc larger than a
/// half circle.  Returns `None` if the radius cannot reach the endpoint.
pub fn arc_center_from_radius(start: (f64, f64), end: (f64, f64), radius: f64,
                              clockwise: bool) -> Option<(f64, f64)> {
    let abs_radius = radius.abs();
    let mid = ((start.0 + end.0) / 2., (start.1 + end.1) / 2.);
    let mut half_length = (mid.0 - end.0).hypot(mid.1 - end.1);
    if half_length < EPSILON || half_length - abs_radius > ARC_TOLERANCE {
        return None;
    }
    half_length = half_length.min(abs_radius);
    let chord_angle = (end.1 - start.1).atan2(end.0 - start.0);
    let theta = if clockwise == (radius > 0.) {
        chord_angle - FRAC_PI_2
    } else {
        chord_angle + FRAC_PI_2
    };
    let offset = abs_radius * (half_length / abs_radius).asin().cos();
    Some((mid.0 + offset * theta.cos(), mid.1 + offset * theta.sin()))
}

/// Angle of a point around a center, in plane coordinates.
pub fn angle_of(center: (f64, f64), point: (f64, f64)) -> f64 {
    (point.1 - center.1).atan2(point.0 - center.0)
}

/// Swept angle (always positive) of an arc between two angles.  Coinciding
/// start and end make a full circle; each additional turn adds one.
pub fn arc_sweep(start_angle: f64, end_angle: f64, clockwise: bool, turns: u32) -> f64 {
    let mut sweep = if clockwise { start_angle - end_angle } else { end_angle - start_angle };
    sweep = sweep.rem_euclid(TAU);
    if sweep < EPSILON {
        sweep = TAU;
    }
    sweep + TAU * turns.saturating_sub(1) as f64
}

/// Whether the angle `probe` lies on the arc starting at `start_angle`.
pub fn angle_on_arc(start_angle: f64, sweep: f64, probe: f64, clockwise: bool) -> bool {
    let delta = if clockwise { start_angle - probe } else { probe - start_angle };
    delta.rem_euclid(TAU) <= sweep + EPSILON
}

/// Evaluate a cubic Bézier curve.
pub fn bezier_point(controls: &[Point3; 4], t: f64) -> Point3 {
    let u = 1. - t;
    let w = [u * u * u, 3. * u * u * t, 3. * u * t * t, t * t * t];
    let mut p = Point3::default();
    for (c, w) in controls.iter().zip(&w) {
        p.x += c.x * w;
        p.y += c.y * w;
        p.z += c.z * w;
    }
    p
}

/// Elevate a quadratic Bézier curve to the equivalent cubic one.
pub fn quadratic_to_cubic(start: Point3, control: Point3, end: Point3) -> [Point3; 4] {
    let lerp = |a: Point3, b: Point3| Point3::new(
        a.x + 2. / 3. * (b.x - a.x),
        a.y + 2. / 3. * (b.y - a.y),
        a.z + 2. / 3. * (b.z - a.z),
    );
    [start, lerp(start, control), lerp(end, control), end]
}

/// Length of the control polygon, an upper bound of the curve length.
pub fn control_polygon_length(controls: &[Point3; 4]) -> f64 {
    controls.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_radius_center() {
        // quarter circle from (0,0) to (5,5)
        let (cx, cy) = arc_center_from_radius((0., 0.), (5., 5.), 5., true).unwrap();
        assert_close(cx, 5.);
        assert_close(cy, 0.);
        let (cx, cy) = arc_center_from_radius((0., 0.), (5., 5.), 5., false).unwrap();
        assert_close(cx, 0.);
        assert_close(cy, 5.);
        // negative radius selects the other center
        let (cx, cy) = arc_center_from_radius((0., 0.), (5., 5.), -5., true).unwrap();
        assert_close(cx, 0.);
        assert_close(cy, 5.);
        // half circle
        let (cx, cy) = arc_center_from_radius((0., 0.), (10., 0.), 5., true).unwrap();
        assert_close(cx, 5.);
        assert_close(cy, 0.);
        assert!(arc_center_from_radius((0., 0.), (10., 0.), 4., true).is_none());
        assert!(arc_center_from_radius((1., 1.), (1., 1.), 4., true).is_none());
    }

    #[test]
    fn test_sweep() {
        assert_close(arc_sweep(PI, 0., true, 1), PI);
        assert_close(arc_sweep(0., FRAC_PI_2, false, 1), FRAC_PI_2);
        assert_close(arc_sweep(0., FRAC_PI_2, true, 1), 3. * FRAC_PI_2);
        assert_close(arc_sweep(1., 1., true, 1), TAU);
        assert_close(arc_sweep(1., 1., true, 2), 2. * TAU);
        assert!(angle_on_arc(PI, PI, FRAC_PI_2, true));
        assert!(!angle_on_arc(PI, PI, -FRAC_PI_2, true));
    }

    #[test]
    fn test_bezier() {
        let controls = quadratic_to_cubic(Point3::new(0., 0., 0.), Point3::new(1., 2., 0.),
                                          Point3::new(2., 0., 0.));
        let mid = bezier_point(&controls, 0.5);
        assert_close(mid.x, 1.);
        assert_close(mid.y, 1.);
        assert_eq!(bezier_point(&controls, 0.), controls[0]);
        assert_eq!(bezier_point(&controls, 1.), controls[3]);
    }
}
