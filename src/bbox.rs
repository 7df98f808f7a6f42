// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Program extents.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use crate::axes::Point3;
use crate::emulate::{RunAction, Shape};
use crate::geometry;
use crate::machine::Plane;

/// Spline sampling distance (mm).
const SPLINE_TOLERANCE: f64 = 0.1;
const MAX_SPLINE_SAMPLES: usize = 1000;

/// An axis aligned bounding box, accumulated from points and motion
/// segments.  Call `conclude` after adding everything.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
    pub size: Point3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        let inf = f64::INFINITY;
        BoundingBox {
            min: Point3::new(inf, inf, inf),
            max: Point3::new(-inf, -inf, -inf),
            size: Point3::default(),
        }
    }
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x && self.min.y > self.max.y && self.min.z > self.max.z
    }

    pub fn add_point(&mut self, p: Point3) {
        for i in 0..3 {
            let v = p.get(i);
            if v < self.min.get(i) {
                self.min.set(i, v);
            }
            if v > self.max.get(i) {
                self.max.set(i, v);
            }
        }
    }

    pub fn add_bounding_box(&mut self, other: &BoundingBox) {
        if !other.is_empty() {
            self.add_point(other.min);
            self.add_point(other.max);
        }
    }

    /// Add an arc, including the points where it crosses a quadrant boundary.
    pub fn add_arc(&mut self, start: Point3, end: Point3, center: Point3, radius: f64,
                   clockwise: bool, plane: Plane, turns: u32) {
        let (a0, a1, _) = plane.axes();
        self.add_point(start);
        self.add_point(end);
        let c = (center.get(a0), center.get(a1));
        let start_angle = geometry::angle_of(c, (start.get(a0), start.get(a1)));
        let end_angle = geometry::angle_of(c, (end.get(a0), end.get(a1)));
        let sweep = geometry::arc_sweep(start_angle, end_angle, clockwise, turns);
        for quadrant in 0..4 {
            let angle = quadrant as f64 * FRAC_PI_2;
            if geometry::angle_on_arc(start_angle, sweep, angle, clockwise) {
                let mut p = start;
                p.set(a0, c.0 + radius * angle.cos());
                p.set(a1, c.1 + radius * angle.sin());
                self.add_point(p);
            }
        }
    }

    /// Add a cubic spline by sampling it.
    pub fn add_spline(&mut self, controls: &[Point3; 4]) {
        let length = geometry::control_polygon_length(controls);
        let samples = ((length / SPLINE_TOLERANCE).ceil() as usize).clamp(8, MAX_SPLINE_SAMPLES);
        for n in 0..=samples {
            self.add_point(geometry::bezier_point(controls, n as f64 / samples as f64));
        }
    }

    /// Add a run action.  Moves in machine coordinates are not part of the
    /// program extents and are skipped.
    pub fn add_action(&mut self, action: &RunAction) {
        if action.is_in_machine_coord {
            return;
        }
        match action.shape {
            Shape::Line => {
                self.add_point(action.start);
                self.add_point(action.end);
            }
            Shape::Arc { center, radius, clockwise, plane, turns } =>
                self.add_arc(action.start, action.end, center, radius, clockwise, plane, turns),
            Shape::Spline { controls } => self.add_spline(&controls),
        }
    }

    /// Finish accumulation: axes that were never touched collapse to zero,
    /// and the size is computed.
    pub fn conclude(&mut self) {
        for i in 0..3 {
            if self.min.get(i) > self.max.get(i) {
                self.min.set(i, 0.);
                self.max.set(i, 0.);
            }
            self.size.set(i, (self.max.get(i) - self.min.get(i)).abs());
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "X {:.3} .. {:.3} ({:.3})\nY {:.3} .. {:.3} ({:.3})\nZ {:.3} .. {:.3} ({:.3})",
               self.min.x, self.max.x, self.size.x,
               self.min.y, self.max.y, self.size.y,
               self.min.z, self.max.z, self.size.z)
    }
}
