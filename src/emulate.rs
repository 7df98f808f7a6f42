// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The motion emulator: replays tokens against a `Machine` and yields the
//! resulting motion segments.
//!
//! Canned cycles are expanded into their individual moves.  The emulator is
//! lazy; each token is only expanded when its actions are pulled.

use std::collections::VecDeque;
use std::fmt;

use crate::axes::{Axes, AxisFlags, Point3};
use crate::geometry::{self, EPSILON, ARC_TOLERANCE};
use crate::machine::{DistanceMode, IjkMode, Machine, Plane, RetractMode};
use crate::token::{Command, ThreadParams, Token, TokenData};
use crate::util::same_at;

/// The geometry of a motion segment.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Shape {
    Line,
    /// A circular or helical arc around `center` in `plane`.
    Arc { center: Point3, radius: f64, clockwise: bool, plane: Plane, turns: u32 },
    /// A cubic Bézier curve, the first and last control points are the start
    /// and end of the action.
    Spline { controls: [Point3; 4] },
}

/// A single motion segment.  Points are in work coordinates, except for
/// actions flagged `is_in_machine_coord`.
#[derive(Clone, Debug)]
pub struct RunAction<'t> {
    /// The token this action was expanded from.
    pub token: &'t Token,
    pub start: Point3,
    pub end: Point3,
    pub shape: Shape,
    pub is_rapid: bool,
    pub is_retract: bool,
    pub is_spindle_synced: bool,
    pub is_in_machine_coord: bool,
}

impl<'t> RunAction<'t> {
    fn new(token: &'t Token, start: Point3, end: Point3, shape: Shape) -> Self {
        RunAction {
            token, start, end, shape,
            is_rapid: false,
            is_retract: false,
            is_spindle_synced: false,
            is_in_machine_coord: false,
        }
    }

    fn rapid(mut self) -> Self {
        self.is_rapid = true;
        self
    }

    fn retract(mut self) -> Self {
        self.is_retract = true;
        self
    }

    fn synced(mut self) -> Self {
        self.is_spindle_synced = true;
        self
    }

    fn in_machine_coord(mut self) -> Self {
        self.is_in_machine_coord = true;
        self
    }
}

/// A geometric problem found while emulating.  The affected move is replaced
/// by a straight line.
#[derive(Clone, PartialEq, Debug)]
pub struct EmulationIssue {
    pub line: usize,
    pub command: Command,
    pub message: String,
}

impl fmt::Display for EmulationIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.command, self.message)
    }
}

/// Iterator over the run actions of a token list.
///
/// The machine should be reset to the state the tokens were parsed from
/// before creating an emulator; iterating changes the machine state.
pub struct Emulator<'m, 't> {
    machine: &'m mut Machine,
    tokens: std::slice::Iter<'t, Token>,
    pending: VecDeque<RunAction<'t>>,
    issues: Vec<EmulationIssue>,
}

impl<'m, 't> Emulator<'m, 't> {
    pub fn new(machine: &'m mut Machine, tokens: &'t [Token]) -> Self {
        Emulator { machine, tokens: tokens.iter(), pending: VecDeque::new(), issues: Vec::new() }
    }

    pub fn machine(&self) -> &Machine {
        &*self.machine
    }

    /// Issues found in the tokens processed so far.
    pub fn issues(&self) -> &[EmulationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<EmulationIssue> {
        self.issues
    }
}

impl<'m, 't> Iterator for Emulator<'m, 't> {
    type Item = RunAction<'t>;

    fn next(&mut self) -> Option<RunAction<'t>> {
        loop {
            if let Some(action) = self.pending.pop_front() {
                return Some(action);
            }
            let token = self.tokens.next()?;
            let known = self.issues.len();
            step(self.machine, token, &mut self.pending, &mut self.issues);
            for issue in &self.issues[known..] {
                tracing::warn!("{}", issue);
            }
            if !self.pending.is_empty() {
                tracing::debug!("{} expanded to {} actions", token.command, self.pending.len());
            }
        }
    }
}

/// Apply a token to the machine, including its motion, discarding the
/// actions.  Used by the parser to track the position.
pub(crate) fn advance(machine: &mut Machine, token: &Token) {
    // threading ends where it started
    if token.command == Command::G76 {
        machine.apply(token);
        return;
    }
    let mut actions = VecDeque::new();
    let mut issues = Vec::new();
    step(machine, token, &mut actions, &mut issues);
}

fn step<'t>(machine: &mut Machine, token: &'t Token, actions: &mut VecDeque<RunAction<'t>>,
            issues: &mut Vec<EmulationIssue>) {
    use Command::*;

    machine.apply(token);
    let mut ex = Expander { machine, token, actions, issues };
    match (token.command, &token.data) {
        (G0, TokenData::Axes(axes)) => ex.line(axes, true),
        (G1, TokenData::Axes(axes)) => ex.line(axes, false),
        (cmd, TokenData::Axes(axes)) if cmd.is_probe() => {
            ex.line(axes, false);
            let position = ex.machine.machine_position();
            ex.machine.set_probe(position, true);
        }
        (G53, &TokenData::MachineMotion { rapid, ref axes }) => ex.machine_move(axes, rapid),
        (G28, TokenData::Axes(axes)) => {
            let stored = ex.machine.g28_position();
            ex.predefined(axes, stored);
        }
        (G30, TokenData::Axes(axes)) => {
            let stored = ex.machine.g30_position();
            ex.predefined(axes, stored);
        }
        (G2, &TokenData::Arc { ref axes, ref ijk, r, turns }) => ex.arc(axes, ijk, r, turns, true),
        (G3, &TokenData::Arc { ref axes, ref ijk, r, turns }) => ex.arc(axes, ijk, r, turns, false),
        (G5, &TokenData::Spline { ref axes, i, j, pq }) |
        (G5_1, &TokenData::Spline { ref axes, i, j, pq }) => ex.spline(axes, i, j, pq),
        (G33, TokenData::SyncMotion { axes, .. }) => {
            let target = ex.absolute(axes);
            let action = ex.motion(&target, Shape::Line).synced();
            ex.push(action);
        }
        (cmd, &TokenData::Drill { ref axes, r, l, .. }) => ex.drill(cmd, axes, r, l),
        (G76, TokenData::Thread(params)) => ex.thread(params),
        _ => ()
    }
}

/// Expands the motion of one token.
struct Expander<'a, 't> {
    machine: &'a mut Machine,
    token: &'t Token,
    actions: &'a mut VecDeque<RunAction<'t>>,
    issues: &'a mut Vec<EmulationIssue>,
}

fn single(axis: usize, value: f64) -> Axes {
    let mut axes = Axes::new();
    axes.set(axis, value);
    axes
}

impl<'a, 't> Expander<'a, 't> {
    fn here(&self) -> Point3 {
        Point3::from_slice(&self.machine.position())
    }

    fn incremental(&self) -> bool {
        self.machine.distance_mode == DistanceMode::Incremental
    }

    fn issue(&mut self, message: String) {
        self.issues.push(EmulationIssue {
            line: self.token.line,
            command: self.token.command,
            message,
        });
    }

    /// Resolve target words to absolute work coordinates.
    fn absolute(&self, axes: &Axes) -> Axes {
        if !self.incremental() {
            return *axes;
        }
        let position = self.machine.position();
        let mut target = Axes::new();
        for (i, v) in axes.iter() {
            target.set(i, position[i] + v);
        }
        target
    }

    /// Move to absolute work coordinates, returning the action.
    fn motion(&mut self, target: &Axes, shape: Shape) -> RunAction<'t> {
        let start = self.here();
        self.machine.move_to(target, false);
        RunAction::new(self.token, start, self.here(), shape)
    }

    fn push(&mut self, action: RunAction<'t>) {
        self.actions.push_back(action);
    }

    fn rapid_to(&mut self, target: &Axes) {
        let action = self.motion(target, Shape::Line).rapid();
        self.push(action);
    }

    fn feed_to(&mut self, target: &Axes) {
        let action = self.motion(target, Shape::Line);
        self.push(action);
    }

    fn line(&mut self, axes: &Axes, rapid: bool) {
        if axes.is_empty() {
            return;
        }
        let target = self.absolute(axes);
        let action = self.motion(&target, Shape::Line);
        self.push(if rapid { action.rapid() } else { action });
    }

    fn machine_move(&mut self, axes: &Axes, rapid: bool) {
        let start = Point3::from_slice(&self.machine.machine_position());
        self.machine.move_machine(axes);
        let end = Point3::from_slice(&self.machine.machine_position());
        let mut action = RunAction::new(self.token, start, end, Shape::Line).in_machine_coord();
        action.is_rapid = rapid;
        self.push(action);
    }

    /// G28/G30: rapid through the given point, then move all axes to the
    /// stored position.
    fn predefined(&mut self, axes: &Axes, stored: [f64; 6]) {
        if !axes.is_empty() {
            let target = self.absolute(axes);
            self.rapid_to(&target);
        }
        let start = Point3::from_slice(&self.machine.machine_position());
        self.machine.set_machine_position(&stored, AxisFlags::ALL);
        let end = Point3::from_slice(&self.machine.machine_position());
        let action = RunAction::new(self.token, start, end, Shape::Line).rapid().in_machine_coord();
        self.push(action);
    }

    fn arc(&mut self, axes: &Axes, ijk: &Axes, r: Option<f64>, turns: u32, clockwise: bool) {
        let plane = self.machine.plane;
        let (a0, a1, _) = plane.axes();
        let start = self.here();
        let target = self.absolute(axes);
        let mut end = start;
        for (i, v) in target.iter().filter(|&(i, _)| i < 3) {
            end.set(i, v);
        }
        let center = match r {
            Some(r) => {
                let found = geometry::arc_center_from_radius(
                    (start.get(a0), start.get(a1)), (end.get(a0), end.get(a1)), r, clockwise);
                match found {
                    Some(center) => center,
                    None => {
                        self.issue(format!("radius {} cannot reach the end point", r));
                        return self.feed_to(&target);
                    }
                }
            }
            None => {
                let absolute = self.machine.ijk_mode == IjkMode::Absolute;
                let coord = |i: usize| {
                    let offset = ijk.get(i).unwrap_or(0.);
                    if absolute { offset } else { start.get(i) + offset }
                };
                (coord(a0), coord(a1))
            }
        };
        let radius = (start.get(a0) - center.0).hypot(start.get(a1) - center.1);
        if radius < EPSILON {
            self.issue("zero radius arc".into());
            return self.feed_to(&target);
        }
        let end_radius = (end.get(a0) - center.0).hypot(end.get(a1) - center.1);
        if (end_radius - radius).abs() > ARC_TOLERANCE {
            self.issue(format!("end point is off the arc by {:.4}", (end_radius - radius).abs()));
        }
        let mut center_point = start;
        center_point.set(a0, center.0);
        center_point.set(a1, center.1);
        let action = self.motion(&target, Shape::Arc { center: center_point, radius, clockwise, plane, turns });
        self.push(action);
    }

    fn spline(&mut self, axes: &Axes, i: f64, j: f64, pq: Option<(f64, f64)>) {
        let start = self.here();
        let target = self.absolute(axes);
        let mut end = start;
        for (i, v) in target.iter().filter(|&(i, _)| i < 3) {
            end.set(i, v);
        }
        let first = Point3::new(start.x + i, start.y + j, start.z);
        let controls = match pq {
            Some((p, q)) => [start, first, Point3::new(end.x + p, end.y + q, end.z), end],
            None => geometry::quadratic_to_cubic(start, first, end),
        };
        if geometry::control_polygon_length(&controls) < EPSILON {
            self.issue("degenerate spline".into());
            return self.feed_to(&target);
        }
        let action = self.motion(&target, Shape::Spline { controls });
        self.push(action);
    }

    /// Canned drilling cycles.
    fn drill(&mut self, command: Command, axes: &Axes, r: f64, repeats: u32) {
        let (a0, a1, normal) = self.machine.plane.axes();
        let incremental = self.incremental();
        let old_z = self.machine.position()[normal];
        let depth = axes.get(normal).unwrap_or(old_z);
        let (r_plane, bottom) = if incremental {
            (old_z + r, old_z + r + depth)
        } else {
            (r, depth)
        };
        let clear = match self.machine.retract_mode {
            RetractMode::RPlane => r_plane,
            RetractMode::OldZ => r_plane.max(old_z),
        };
        self.machine.retract_old_z = old_z;
        let rapid_out = !matches!(command, Command::G84 | Command::G85 | Command::G89);

        if old_z < r_plane {
            self.rapid_to(&single(normal, r_plane));
        }
        for n in 0..repeats {
            let position = self.machine.position();
            let mut xy = Axes::new();
            for &i in &[a0, a1] {
                if let Some(v) = axes.get(i) {
                    xy.set(i, if incremental { position[i] + v } else { v });
                }
            }
            if !xy.is_empty() && (n == 0 || incremental) {
                self.rapid_to(&xy);
            }
            if !same_at(self.machine.position()[normal], r_plane, self.machine.precision()) {
                self.rapid_to(&single(normal, r_plane));
            }
            self.feed_to(&single(normal, bottom));
            let action = self.motion(&single(normal, clear), Shape::Line).retract();
            self.push(if rapid_out { action.rapid() } else { action });
        }
    }

    /// The G76 threading cycle, in the XZ plane.
    fn thread(&mut self, t: &ThreadParams) {
        let start = self.machine.position();
        let (x0, z0) = (start[0], start[2]);
        let z_end = match t.axes.get(2) {
            Some(z) if self.incremental() => z0 + z,
            Some(z) => z,
            None => z0,
        };
        let z_dir = if z_end < z0 { -1. } else { 1. };
        let x_dir = t.i.signum();
        let x_peak = x0 + t.i;
        let shift_per_depth = t.q.to_radians().tan();
        let entry_taper = t.l == 1 || t.l == 3;
        let exit_taper = t.l == 2 || t.l == 3;

        let xz = |x: f64, z: f64| {
            let mut axes = Axes::new();
            axes.set(0, x);
            axes.set(2, z);
            axes
        };
        for depth in t.pass_depths() {
            let x_cut = x_peak + x_dir * depth;
            let shift = z_dir * depth * shift_per_depth;
            let (zs, ze) = (z0 + shift, z_end + shift);
            self.rapid_to(&xz(x0, zs));
            if entry_taper {
                self.rapid_to(&single(0, x_peak));
                let action = self.motion(&xz(x_cut, zs + z_dir * t.e), Shape::Line).synced();
                self.push(action);
            } else {
                self.rapid_to(&single(0, x_cut));
            }
            let cut_end = if exit_taper { ze - z_dir * t.e } else { ze };
            let action = self.motion(&single(2, cut_end), Shape::Line).synced();
            self.push(action);
            if exit_taper {
                let action = self.motion(&xz(x_peak, ze), Shape::Line).synced();
                self.push(action);
            }
            let action = self.motion(&single(0, x0), Shape::Line).rapid().retract();
            self.push(action);
        }
        self.rapid_to(&xz(x0, z0));
    }
}
