// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The machine state model: modal state shared by the parser and the
//! emulator.
//!
//! There is exactly one `Machine` per parse or emulation session.  It is
//! passed by mutable reference to whoever currently drives it, and brought to a
//! known state with `reset` (from a `ControllerSnapshot`) before each session.

mod enums;
mod snapshot;
mod tables;

use crate::axes::{Axes, AxisFlags, NUM_AXES};
use crate::token::{Command, Token, TokenData};
use crate::util::MM_PER_INCH;

pub use self::enums::*;
pub use self::snapshot::*;
pub use self::tables::*;

/// Sticky canned cycle words, reused by later blocks of the same cycle.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct CycleWords {
    /// Target position on the drilling axis.
    pub depth: Option<f64>,
    pub r: Option<f64>,
    pub p: Option<f64>,
    pub q: Option<f64>,
}

/// How a program word is converted to its internal value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WordKind {
    /// Motion targets and arc centers: units, scaling, lathe diameter.
    Motion,
    /// Other positions (G10, G28, G30, G53, G92): units, lathe diameter.
    Position,
    /// Plain lengths such as R, K or F: units only.
    Length,
    /// Unitless values.
    Raw,
}

/// Conversion between program words and internal values, as determined by
/// the units, lathe mode and scaling state.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Conversion {
    pub imperial: bool,
    pub diameter: bool,
    pub scale: [f64; NUM_AXES],
}

impl Default for Conversion {
    fn default() -> Self {
        Conversion { imperial: false, diameter: false, scale: [1.; NUM_AXES] }
    }
}

impl Conversion {
    fn factor(&self, kind: WordKind, axis: usize) -> f64 {
        let mut f = 1.;
        if self.imperial && axis < 3 && kind != WordKind::Raw {
            f *= MM_PER_INCH;
        }
        if kind == WordKind::Motion {
            f *= self.scale[axis];
        }
        if self.diameter && axis == 0 && matches!(kind, WordKind::Motion | WordKind::Position) {
            f /= 2.;
        }
        f
    }

    /// Program word to internal value.
    pub fn to_internal(&self, kind: WordKind, axis: usize, value: f64) -> f64 {
        value * self.factor(kind, axis)
    }

    /// Internal value to program word.
    pub fn to_program(&self, kind: WordKind, axis: usize, value: f64) -> f64 {
        let f = self.factor(kind, axis);
        if f == 0. { value } else { value / f }
    }
}

/// The virtual machine implied by a G-code program.
#[derive(Clone, Debug)]
pub struct Machine {
    coord_systems: Vec<CoordinateSystem>,
    active_coord: CoordSystemId,
    g92_enabled: bool,
    scale_factors: [f64; NUM_AXES],
    tool_offsets: [f64; NUM_AXES],
    tool_table: ToolTable,
    /// Current position in machine coordinates.
    position: [f64; NUM_AXES],
    probe: ProbeResult,
    precision: Option<u32>,

    pub plane: Plane,
    pub units: Units,
    pub distance_mode: DistanceMode,
    pub ijk_mode: IjkMode,
    pub feed_rate_mode: FeedRateMode,
    pub lathe_mode: LatheMode,
    pub tool_length_offset: ToolLengthOffset,
    pub cutter_comp: CutterComp,
    pub spindle: SpindleState,
    pub coolant: CoolantState,
    pub rpm_mode: SpindleRpmMode,
    pub retract_mode: RetractMode,
    pub path_mode: PathMode,
    /// Tool currently in the spindle.
    pub tool: u32,
    /// Tool selected by the last T word.
    pub selected_tool: u32,
    pub feed_rate: f64,
    pub rpm: f64,
    /// The sticky motion mode applied to blocks with axis words only.
    pub motion_mode: Command,
    pub cycle: CycleWords,
    /// Position on the drilling axis at the start of the last canned cycle.
    pub retract_old_z: f64,
    /// Number of the block being processed.
    pub line: usize,
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        let mut machine = Machine {
            coord_systems: CoordSystemId::ALL.iter().map(|&id| CoordinateSystem::new(id)).collect(),
            active_coord: CoordSystemId::G54,
            g92_enabled: false,
            scale_factors: [1.; NUM_AXES],
            tool_offsets: [0.; NUM_AXES],
            tool_table: ToolTable::default(),
            position: [0.; NUM_AXES],
            probe: ProbeResult::default(),
            precision: None,
            plane: Plane::default(),
            units: Units::default(),
            distance_mode: DistanceMode::default(),
            ijk_mode: IjkMode::default(),
            feed_rate_mode: FeedRateMode::default(),
            lathe_mode: LatheMode::default(),
            tool_length_offset: ToolLengthOffset::default(),
            cutter_comp: CutterComp::default(),
            spindle: SpindleState::default(),
            coolant: CoolantState::default(),
            rpm_mode: SpindleRpmMode::default(),
            retract_mode: RetractMode::default(),
            path_mode: PathMode::default(),
            tool: 0,
            selected_tool: 0,
            feed_rate: 0.,
            rpm: 0.,
            motion_mode: Command::G0,
            cycle: CycleWords::default(),
            retract_old_z: 0.,
            line: 0,
        };
        machine.reset(&ControllerSnapshot::default());
        machine
    }

    /// Re-synchronize from the live controller state.  Must be called before
    /// parsing or emulating a new program.
    pub fn reset(&mut self, snapshot: &ControllerSnapshot) {
        for cs in &mut self.coord_systems {
            cs.values = [0.; NUM_AXES];
        }
        for cs in &snapshot.coord_systems {
            self.coord_systems[cs.id.index()].values = cs.values;
        }
        // the G92 offset reported by the controller is in effect if nonzero
        self.g92_enabled = self.g92_offset().iter().any(|&v| v != 0.);
        self.tool_table = ToolTable::new(snapshot.tools.iter().cloned());
        self.tool_offsets = snapshot.tool_length_offset;
        self.tool_length_offset = if self.tool_offsets.iter().any(|&v| v != 0.) {
            ToolLengthOffset::Enabled
        } else {
            ToolLengthOffset::Cancelled
        };
        self.scale_factors = [1.; NUM_AXES];
        self.position = snapshot.machine_position;
        self.probe = snapshot.probe.clone().unwrap_or_default();
        self.precision = None;

        let state = &snapshot.parser_state;
        self.active_coord = if state.coord_system.is_work() {
            state.coord_system
        } else {
            CoordSystemId::G54
        };
        self.plane = state.plane;
        self.units = state.units;
        self.distance_mode = state.distance;
        self.ijk_mode = state.ijk;
        self.feed_rate_mode = state.feed_rate_mode;
        self.lathe_mode = state.lathe_mode;
        self.spindle = state.spindle;
        self.coolant = state.coolant;
        self.tool = state.tool;
        self.selected_tool = state.tool;
        self.feed_rate = state.feed_rate;
        self.rpm = state.rpm;
        self.motion_mode = Command::from_code('G', state.motion as u32).unwrap_or(Command::G0);
        self.cutter_comp = CutterComp::Off;
        self.rpm_mode = SpindleRpmMode::Rpm;
        self.retract_mode = RetractMode::OldZ;
        self.path_mode = PathMode::Exact;
        self.cycle = CycleWords::default();
        self.retract_old_z = 0.;
        self.line = 0;
        tracing::debug!("Machine reset, active coordinate system {}", self.active_coord);
    }

    // -- precision --

    /// Decimal precision applied to axis values: inferred from the program,
    /// but never below the default for the active units.
    pub fn precision(&self) -> u32 {
        let default = self.units.precision();
        self.precision.map_or(default, |p| p.max(default))
    }

    /// The precision inferred from the program, if any.
    pub fn inferred_precision(&self) -> Option<u32> {
        self.precision
    }

    pub fn set_inferred_precision(&mut self, precision: Option<u32>) {
        self.precision = precision;
    }

    pub fn conversion(&self) -> Conversion {
        Conversion {
            imperial: self.units == Units::Imperial,
            diameter: self.lathe_mode == LatheMode::Diameter,
            scale: self.scale_factors,
        }
    }

    pub fn infer_precision(&mut self, fraction_digits: u32) {
        if self.precision.is_none() {
            self.precision = Some(fraction_digits);
        }
    }

    // -- coordinate systems --

    pub fn active_coordinate_system(&self) -> &CoordinateSystem {
        &self.coord_systems[self.active_coord.index()]
    }

    pub fn coordinate_system(&self, id: CoordSystemId) -> &CoordinateSystem {
        &self.coord_systems[id.index()]
    }

    pub fn select_coordinate_system(&mut self, id: CoordSystemId) {
        self.active_coord = id;
    }

    /// Set the flagged axes of a coordinate system (G10 L2).
    pub fn set_coordinate_system(&mut self, id: CoordSystemId, values: &Axes) {
        self.coord_systems[id.index()].update(&values.values, values.flags);
    }

    /// Set the flagged axes of a coordinate system such that the current
    /// position gets the given work coordinates (G10 L20).
    pub fn set_coordinate_system_from_position(&mut self, id: CoordSystemId, values: &Axes) {
        let mut offsets = Axes::new();
        for (i, v) in values.iter() {
            offsets.set(i, self.position[i] - self.g92_value(i) - self.tool_offsets[i] - v);
        }
        self.set_coordinate_system(id, &offsets);
    }

    /// Store the current machine position as a predefined position (G28.1,
    /// G30.1).
    pub fn set_predefined_position(&mut self, id: CoordSystemId) {
        let position = self.position;
        self.coord_systems[id.index()].update(&position, AxisFlags::ALL);
    }

    pub fn g28_position(&self) -> [f64; NUM_AXES] {
        self.coordinate_system(CoordSystemId::G28).values
    }

    pub fn g30_position(&self) -> [f64; NUM_AXES] {
        self.coordinate_system(CoordSystemId::G30).values
    }

    // -- G92 --

    pub fn g92_offset(&self) -> [f64; NUM_AXES] {
        self.coordinate_system(CoordSystemId::G92).values
    }

    pub fn g92_enabled(&self) -> bool {
        self.g92_enabled
    }

    fn g92_value(&self, i: usize) -> f64 {
        if self.g92_enabled { self.g92_offset()[i] } else { 0. }
    }

    /// Set the G92 origin such that the current position gets the given work
    /// coordinates on the flagged axes.
    pub fn set_g92_offset(&mut self, values: &Axes) {
        let cs = self.active_coordinate_system().values;
        let mut origin = Axes::new();
        for (i, v) in values.iter() {
            origin.set(i, self.position[i] - cs[i] - self.tool_offsets[i] - v);
        }
        if !self.g92_enabled {
            // a suspended offset does not survive a new G92 on other axes
            self.coord_systems[CoordSystemId::G92.index()].values = [0.; NUM_AXES];
        }
        self.set_coordinate_system(CoordSystemId::G92, &origin);
        self.g92_enabled = true;
    }

    /// G92.1: reset and disable the offset.
    pub fn g92_clear(&mut self) {
        self.coord_systems[CoordSystemId::G92.index()].values = [0.; NUM_AXES];
        self.g92_enabled = false;
    }

    /// G92.2: disable but keep the offset.
    pub fn g92_suspend(&mut self) {
        self.g92_enabled = false;
    }

    /// G92.3: re-enable the kept offset.
    pub fn g92_restore(&mut self) {
        self.g92_enabled = true;
    }

    // -- tools --

    pub fn tool_table(&self) -> &ToolTable {
        &self.tool_table
    }

    /// Set the flagged axes and optionally the radius of a tool table entry
    /// (G10 L1).
    pub fn set_tool_table(&mut self, number: u32, values: &Axes, radius: Option<f64>) {
        let tool = self.tool_table.entry(number);
        for (i, v) in values.iter() {
            tool.offsets[i] = v;
        }
        if let Some(r) = radius {
            tool.radius = r;
        }
    }

    /// Set the flagged axes of a tool entry such that the current position gets
    /// the given work coordinates, using the given coordinate system (G10
    /// L10/L11).
    pub fn set_tool_table_from_position(&mut self, number: u32, values: &Axes,
                                        radius: Option<f64>, cs: CoordSystemId) {
        let cs = self.coordinate_system(cs).values;
        let mut offsets = Axes::new();
        for (i, v) in values.iter() {
            offsets.set(i, self.position[i] - cs[i] - self.g92_value(i) - v);
        }
        self.set_tool_table(number, &offsets, radius);
    }

    /// Apply the offsets of a tool from the table (G43).
    pub fn set_tool_offset(&mut self, number: u32) {
        self.tool_offsets = self.tool_table.get(number).map_or([0.; NUM_AXES], |t| t.offsets);
        self.tool_length_offset = ToolLengthOffset::Enabled;
    }

    /// Add the offsets of a tool from the table (G43.2).
    pub fn add_tool_offset(&mut self, number: u32) {
        if let Some(tool) = self.tool_table.get(number) {
            for (o, v) in self.tool_offsets.iter_mut().zip(&tool.offsets) {
                *o += v;
            }
        }
        self.tool_length_offset = ToolLengthOffset::ApplyAdditional;
    }

    /// Set the flagged axes of the tool offset directly (G43.1).
    pub fn dynamic_tool_offset(&mut self, values: &Axes) {
        for (i, v) in values.iter() {
            self.tool_offsets[i] = v;
        }
        self.tool_length_offset = ToolLengthOffset::Dynamic;
    }

    /// G49.
    pub fn cancel_tool_compensation(&mut self) {
        self.tool_offsets = [0.; NUM_AXES];
        self.tool_length_offset = ToolLengthOffset::Cancelled;
    }

    pub fn tool_offset(&self) -> [f64; NUM_AXES] {
        self.tool_offsets
    }

    // -- scaling --

    pub fn scale_factor(&self, i: usize) -> f64 {
        self.scale_factors[i]
    }

    pub fn is_scaled(&self) -> bool {
        self.scale_factors.iter().any(|&f| f != 1.)
    }

    /// Set the flagged axes' scale factors (G51).
    pub fn set_scaling(&mut self, factors: &Axes) {
        for (i, v) in factors.iter() {
            self.scale_factors[i] = v;
        }
    }

    /// G50.
    pub fn clear_scaling(&mut self) {
        self.scale_factors = [1.; NUM_AXES];
    }

    // -- position --

    /// Sum of all offsets between machine and work coordinates on one axis.
    pub fn work_offset(&self, i: usize) -> f64 {
        self.active_coordinate_system().values[i] + self.g92_value(i) + self.tool_offsets[i]
    }

    pub fn work_to_machine(&self, i: usize, value: f64) -> f64 {
        value + self.work_offset(i)
    }

    pub fn machine_to_work(&self, i: usize, value: f64) -> f64 {
        value - self.work_offset(i)
    }

    pub fn machine_position(&self) -> [f64; NUM_AXES] {
        self.position
    }

    /// Current position in work coordinates.
    pub fn position(&self) -> [f64; NUM_AXES] {
        let mut pos = self.position;
        for (i, p) in pos.iter_mut().enumerate() {
            *p = self.machine_to_work(i, *p);
        }
        pos
    }

    /// Move the flagged axes to the given work coordinates, or by the given
    /// distances if `relative`.
    pub fn move_to(&mut self, target: &Axes, relative: bool) {
        for (i, v) in target.iter() {
            if relative {
                self.position[i] += v;
            } else {
                self.position[i] = self.work_to_machine(i, v);
            }
        }
    }

    /// Move the flagged axes to the given machine coordinates (G53).
    pub fn move_machine(&mut self, target: &Axes) {
        for (i, v) in target.iter() {
            self.position[i] = v;
        }
    }

    /// Set the flagged axes of the machine position without any motion.
    pub fn set_machine_position(&mut self, position: &[f64; NUM_AXES], flags: AxisFlags) {
        for i in flags.iter() {
            self.position[i] = position[i];
        }
    }

    // -- probing --

    pub fn probe(&self) -> &ProbeResult {
        &self.probe
    }

    pub fn set_probe(&mut self, position: [f64; NUM_AXES], success: bool) {
        self.probe = ProbeResult { position, success };
    }
}

impl Machine {
    /// Apply the state changes implied by a token.  Positional effects of
    /// motion commands are left to the emulator.
    pub fn apply(&mut self, token: &Token) {
        use Command::*;
        let data = &token.data;
        match (token.command, data) {
            (Feedrate, &TokenData::Value(f)) => self.feed_rate = f,
            (SpindleRpm, &TokenData::Value(s)) => self.rpm = s,
            (ToolSelect, &TokenData::Tool(t)) => self.selected_tool = t,
            (M6, _) => self.tool = self.selected_tool,
            (M61, &TokenData::Tool(t)) => {
                self.tool = t;
                self.selected_tool = t;
            }
            (M3, _) => self.spindle = SpindleState::Cw,
            (M4, _) => self.spindle = SpindleState::Ccw,
            (M5, _) => self.spindle = SpindleState::Off,
            (M7, _) => self.coolant.mist = true,
            (M8, _) => self.coolant.flood = true,
            (M9, _) => self.coolant = CoolantState::default(),
            (M2, _) | (M30, _) => self.end_program(),
            (G93, _) => self.feed_rate_mode = FeedRateMode::InverseTime,
            (G94, _) => self.feed_rate_mode = FeedRateMode::UnitsPerMin,
            (G95, _) => self.feed_rate_mode = FeedRateMode::UnitsPerRev,
            (G96, _) => self.rpm_mode = SpindleRpmMode::Css,
            (G97, _) => self.rpm_mode = SpindleRpmMode::Rpm,
            (G17, _) => self.plane = Plane::XY,
            (G18, _) => self.plane = Plane::XZ,
            (G19, _) => self.plane = Plane::YZ,
            (G20, _) => self.units = Units::Imperial,
            (G21, _) => self.units = Units::Metric,
            (G7, _) => self.lathe_mode = LatheMode::Diameter,
            (G8, _) => self.lathe_mode = LatheMode::Radius,
            (G50, _) => self.clear_scaling(),
            (G51, TokenData::Axes(axes)) => self.set_scaling(axes),
            (G40, _) => self.cutter_comp = CutterComp::Off,
            (G41, _) => self.cutter_comp = CutterComp::Left,
            (G42, _) => self.cutter_comp = CutterComp::Right,
            (G43, &TokenData::Tool(h)) => self.set_tool_offset(h),
            (G43_1, TokenData::Axes(axes)) => self.dynamic_tool_offset(axes),
            (G43_2, &TokenData::Tool(h)) => self.add_tool_offset(h),
            (G49, _) => self.cancel_tool_compensation(),
            (G54, _) => self.select_coordinate_system(CoordSystemId::G54),
            (G55, _) => self.select_coordinate_system(CoordSystemId::G55),
            (G56, _) => self.select_coordinate_system(CoordSystemId::G56),
            (G57, _) => self.select_coordinate_system(CoordSystemId::G57),
            (G58, _) => self.select_coordinate_system(CoordSystemId::G58),
            (G59, _) => self.select_coordinate_system(CoordSystemId::G59),
            (G59_1, _) => self.select_coordinate_system(CoordSystemId::G59_1),
            (G59_2, _) => self.select_coordinate_system(CoordSystemId::G59_2),
            (G59_3, _) => self.select_coordinate_system(CoordSystemId::G59_3),
            (G61, _) => self.path_mode = PathMode::Exact,
            (G61_1, _) => self.path_mode = PathMode::ExactStop,
            (G64, _) => self.path_mode = PathMode::Blending,
            (G90, _) => self.distance_mode = DistanceMode::Absolute,
            (G91, _) => self.distance_mode = DistanceMode::Incremental,
            (G90_1, _) => self.ijk_mode = IjkMode::Absolute,
            (G91_1, _) => self.ijk_mode = IjkMode::Incremental,
            (G98, _) => self.retract_mode = RetractMode::OldZ,
            (G99, _) => self.retract_mode = RetractMode::RPlane,
            (G10, &TokenData::Offsets { l, p, ref axes, r }) => self.apply_g10(l, p, axes, r),
            (G28_1, _) => self.set_predefined_position(CoordSystemId::G28),
            (G30_1, _) => self.set_predefined_position(CoordSystemId::G30),
            (G92, TokenData::Axes(axes)) => self.set_g92_offset(axes),
            (G92_1, _) => self.g92_clear(),
            (G92_2, _) => self.g92_suspend(),
            (G92_3, _) => self.g92_restore(),
            (G80, _) => self.motion_mode = G80,
            (G53, &TokenData::MachineMotion { rapid, .. }) =>
                self.motion_mode = if rapid { G0 } else { G1 },
            (cmd, _) if cmd.is_motion() => self.motion_mode = cmd,
            _ => ()
        }
    }

    fn apply_g10(&mut self, l: u32, p: u32, axes: &Axes, r: Option<f64>) {
        let cs = if p == 0 {
            Some(self.active_coord)
        } else {
            CoordSystemId::from_number(p)
        };
        match (l, cs) {
            (1, _) => self.set_tool_table(p, axes, r),
            (10, _) => self.set_tool_table_from_position(p, axes, r, self.active_coord),
            (11, _) => self.set_tool_table_from_position(p, axes, r, CoordSystemId::G59_3),
            (2, Some(cs)) => self.set_coordinate_system(cs, axes),
            (20, Some(cs)) => self.set_coordinate_system_from_position(cs, axes),
            _ => tracing::debug!("Ignoring G10 L{} P{}", l, p),
        }
    }

    /// The modal state reset performed by M2 and M30.
    fn end_program(&mut self) {
        self.active_coord = CoordSystemId::G54;
        self.plane = Plane::XY;
        self.distance_mode = DistanceMode::Absolute;
        self.feed_rate_mode = FeedRateMode::UnitsPerMin;
        self.cutter_comp = CutterComp::Off;
        self.spindle = SpindleState::Off;
        self.coolant = CoolantState::default();
        self.motion_mode = Command::G1;
        self.g92_suspend();
    }
}

impl Synchronize for Machine {
    fn sync(&mut self, snapshot: &ControllerSnapshot) {
        self.reset(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(values: &[(usize, f64)]) -> Axes {
        let mut a = Axes::new();
        for &(i, v) in values {
            a.set(i, v);
        }
        a
    }

    #[test]
    fn test_partial_update() {
        let mut m = Machine::new();
        m.set_coordinate_system(CoordSystemId::G55, &axes(&[(0, 10.), (2, -5.)]));
        m.set_coordinate_system(CoordSystemId::G55, &axes(&[(1, 3.)]));
        assert_eq!(m.coordinate_system(CoordSystemId::G55).values, [10., 3., -5., 0., 0., 0.]);
    }

    #[test]
    fn test_identity_of_active_system() {
        let mut m = Machine::new();
        m.select_coordinate_system(CoordSystemId::G56);
        m.set_coordinate_system(CoordSystemId::G56, &axes(&[(0, 7.)]));
        assert_eq!(m.active_coordinate_system().values[0], 7.);
        assert_eq!(m.position()[0], -7.);
    }

    #[test]
    fn test_g92() {
        let mut m = Machine::new();
        m.move_to(&axes(&[(0, 10.)]), false);
        m.set_g92_offset(&axes(&[(0, 0.)]));
        assert_eq!(m.position()[0], 0.);
        assert_eq!(m.g92_offset()[0], 10.);
        m.g92_suspend();
        assert_eq!(m.position()[0], 10.);
        m.g92_restore();
        assert_eq!(m.position()[0], 0.);
        m.g92_clear();
        assert_eq!(m.position()[0], 10.);
        assert!(!m.g92_enabled());
    }

    #[test]
    fn test_tool_offsets() {
        let mut m = Machine::new();
        m.set_tool_table(3, &axes(&[(2, 12.5)]), Some(1.5));
        m.set_tool_offset(3);
        assert_eq!(m.tool_offset()[2], 12.5);
        m.add_tool_offset(3);
        assert_eq!(m.tool_offset()[2], 25.);
        m.dynamic_tool_offset(&axes(&[(2, 1.)]));
        assert_eq!(m.tool_offset()[2], 1.);
        m.cancel_tool_compensation();
        assert_eq!(m.tool_offset(), [0.; NUM_AXES]);
        assert_eq!(m.tool_table().get(3).unwrap().radius, 1.5);
    }

    #[test]
    fn test_reset_from_snapshot() {
        let snapshot = ControllerSnapshot::from_report(
            "[G54:1.000,2.000,3.000]\n[G55:0.000,0.000,0.000]\n[G92:0.000,0.000,0.000]\n\
             [TLO:0.000]\n[PRB:1.000,1.000,-2.000:1]\n\
             [GC:G1 G55 G18 G20 G91 G94 M3 M8 T2 F100 S1000]\nok").unwrap();
        let mut m = Machine::new();
        m.set_scaling(&axes(&[(0, 2.)]));
        m.sync(&snapshot);
        assert_eq!(m.coordinate_system(CoordSystemId::G54).values[..3], [1., 2., 3.]);
        assert_eq!(m.active_coordinate_system().id, CoordSystemId::G55);
        assert_eq!(m.plane, Plane::XZ);
        assert_eq!(m.units, Units::Imperial);
        assert_eq!(m.distance_mode, DistanceMode::Incremental);
        assert_eq!(m.motion_mode, Command::G1);
        assert_eq!(m.spindle, SpindleState::Cw);
        assert!(m.coolant.flood && !m.coolant.mist);
        assert_eq!(m.tool, 2);
        assert_eq!(m.scale_factor(0), 1.);
        assert!(m.probe().success);
        assert!(!m.g92_enabled());
    }

    #[test]
    fn test_reset_origin() {
        let mut m = Machine::new();
        m.move_to(&axes(&[(0, 10.)]), false);
        m.set_g92_offset(&axes(&[(0, 0.)]));
        m.set_scaling(&axes(&[(0, 2.)]));
        m.reset(&ControllerSnapshot::default());
        assert!(!m.g92_enabled());
        assert_eq!(m.g92_offset()[0], 0.);
        assert_eq!(m.scale_factor(0), 1.);
        assert_eq!(m.position()[0], 0.);

        // an origin reported by the controller stays in effect
        let mut snapshot = ControllerSnapshot::default();
        snapshot.coord_systems.push(CoordinateSystem {
            id: CoordSystemId::G92,
            values: [1., 0., 0., 0., 0., 0.],
        });
        snapshot.machine_position[0] = 5.;
        m.reset(&snapshot);
        assert!(m.g92_enabled());
        assert_eq!(m.position()[0], 4.);
    }
}
