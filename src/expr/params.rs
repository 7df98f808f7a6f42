// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::collections::HashMap;
use std::fmt;

use crate::axes::Axis;
use crate::error::{fail, ErrorKind, GCodeResult};
use crate::machine::*;
use crate::util::MM_PER_INCH;

/// Highest parameter number.
pub const MAX_PARAM: u32 = 5602;
/// Parameters from this number on are computed from the machine state.
pub const FIRST_READ_ONLY: u32 = 5061;

/// Reported by `#<_vmajor>` and `#<_vminor>`.
const VERSION: (f64, f64) = (2., 9.);

/// A reference to a numbered or named parameter.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ParamRef {
    Numbered(u32),
    /// Normalized (lowercase, without spaces) name.
    Named(String),
}

impl fmt::Display for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamRef::Numbered(n) => write!(f, "#{}", n),
            ParamRef::Named(s) => write!(f, "#<{}>", s),
        }
    }
}

/// Normalize a parameter name: case-insensitive, spaces removed.
pub fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

/// Parameter storage.  Read-only parameters are views over a `Machine`, which
/// must be given for every read.
#[derive(Clone, Debug, Default)]
pub struct Parameters {
    numbered: HashMap<u32, f64>,
    named: HashMap<String, f64>,
}

fn flag(b: bool) -> f64 {
    if b { 1. } else { 0. }
}

/// Convert an internal length to the active program units.
fn user_length(machine: &Machine, axis: usize, value: f64) -> f64 {
    let linear = Axis::from_index(axis).map_or(false, Axis::is_linear);
    if linear && machine.units == Units::Imperial {
        value / MM_PER_INCH
    } else {
        value
    }
}

fn computed(id: u32, m: &Machine) -> f64 {
    let axis = |base: u32| (id - base) as usize;
    match id {
        5061..=5066 => {
            let i = axis(5061);
            user_length(m, i, m.machine_to_work(i, m.probe().position[i]))
        }
        5070 => flag(m.probe().success),
        5161..=5166 => user_length(m, axis(5161), m.g28_position()[axis(5161)]),
        5181..=5186 => user_length(m, axis(5181), m.g30_position()[axis(5181)]),
        5210 => flag(m.g92_enabled()),
        5211..=5216 => user_length(m, axis(5211), m.g92_offset()[axis(5211)]),
        5220 => m.active_coordinate_system().id.number() as f64,
        5221..=5400 if (id - 5221) % 20 < 6 => {
            let cs = CoordSystemId::from_number((id - 5221) / 20 + 1);
            let i = ((id - 5221) % 20) as usize;
            cs.map_or(0., |cs| user_length(m, i, m.coordinate_system(cs).values[i]))
        }
        5400 => m.tool as f64,
        5401..=5406 => user_length(m, axis(5401), m.tool_offset()[axis(5401)]),
        5410 => m.tool_table().get(m.tool).map_or(0., |t| user_length(m, 0, 2. * t.radius)),
        5420..=5425 => user_length(m, axis(5420), m.position()[axis(5420)]),
        _ => 0.
    }
}

const SYSTEM_NAMES: &[&str] = &[
    "_vmajor", "_vminor", "_line", "_motion_mode", "_plane", "_ccomp", "_metric",
    "_imperial", "_absolute", "_incremental", "_inverse_time", "_units_per_minute",
    "_units_per_rev", "_coord_system", "_tool_offset", "_retract_r_plane",
    "_retract_old_z", "_spindle_rpm_mode", "_spindle_css_mode", "_ijk_absolute_mode",
    "_lathe_diameter_mode", "_lathe_radius_mode", "_spindle_on", "_spindle_cw",
    "_mist", "_flood", "_feed", "_rpm", "_x", "_y", "_z", "_a", "_b", "_c",
    "_current_tool", "_selected_tool",
];

fn is_system(name: &str) -> bool {
    SYSTEM_NAMES.contains(&name)
}

fn system(name: &str, m: &Machine) -> Option<f64> {
    let position = |i: usize| user_length(m, i, m.position()[i]);
    Some(match name {
        "_vmajor" => VERSION.0,
        "_vminor" => VERSION.1,
        "_line" => m.line as f64,
        "_motion_mode" => m.motion_mode.code().map_or(0., |(_, c)| c as f64 / 10.),
        "_plane" => m.plane.code() as f64,
        "_ccomp" => match m.cutter_comp {
            CutterComp::Off => 400.,
            CutterComp::Left => 410.,
            CutterComp::Right => 420.,
        },
        "_metric" => flag(m.units == Units::Metric),
        "_imperial" => flag(m.units == Units::Imperial),
        "_absolute" => flag(m.distance_mode == DistanceMode::Absolute),
        "_incremental" => flag(m.distance_mode == DistanceMode::Incremental),
        "_inverse_time" => flag(m.feed_rate_mode == FeedRateMode::InverseTime),
        "_units_per_minute" => flag(m.feed_rate_mode == FeedRateMode::UnitsPerMin),
        "_units_per_rev" => flag(m.feed_rate_mode == FeedRateMode::UnitsPerRev),
        "_coord_system" => m.active_coordinate_system().id.code() as f64,
        "_tool_offset" => flag(m.tool_length_offset != ToolLengthOffset::Cancelled),
        "_retract_r_plane" => flag(m.retract_mode == RetractMode::RPlane),
        "_retract_old_z" => flag(m.retract_mode == RetractMode::OldZ),
        "_spindle_rpm_mode" => flag(m.rpm_mode == SpindleRpmMode::Rpm),
        "_spindle_css_mode" => flag(m.rpm_mode == SpindleRpmMode::Css),
        "_ijk_absolute_mode" => flag(m.ijk_mode == IjkMode::Absolute),
        "_lathe_diameter_mode" => flag(m.lathe_mode == LatheMode::Diameter),
        "_lathe_radius_mode" => flag(m.lathe_mode == LatheMode::Radius),
        "_spindle_on" => flag(m.spindle != SpindleState::Off),
        "_spindle_cw" => flag(m.spindle == SpindleState::Cw),
        "_mist" => flag(m.coolant.mist),
        "_flood" => flag(m.coolant.flood),
        "_feed" => m.feed_rate,
        "_rpm" => m.rpm,
        "_x" => position(0),
        "_y" => position(1),
        "_z" => position(2),
        "_a" => position(3),
        "_b" => position(4),
        "_c" => position(5),
        "_current_tool" => m.tool as f64,
        "_selected_tool" => m.selected_tool as f64,
        _ => return None
    })
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_id(id: u32) -> GCodeResult<()> {
        if id == 0 || id > MAX_PARAM {
            return fail(ErrorKind::ExpressionArgumentOutOfRange, format!("parameter #{}", id));
        }
        Ok(())
    }

    /// Read a numbered parameter.  Unset parameters read as zero.
    pub fn get(&self, id: u32, machine: &Machine) -> GCodeResult<f64> {
        Self::check_id(id)?;
        if id >= FIRST_READ_ONLY {
            Ok(computed(id, machine))
        } else {
            Ok(self.numbered.get(&id).copied().unwrap_or(0.))
        }
    }

    pub fn set(&mut self, id: u32, value: f64) -> GCodeResult<()> {
        Self::check_id(id)?;
        if id >= FIRST_READ_ONLY {
            return fail(ErrorKind::ParameterReadOnly, format!("#{}", id));
        }
        self.numbered.insert(id, value);
        Ok(())
    }

    /// Read a named parameter; reading an undefined one is an error.
    pub fn get_named(&self, name: &str, machine: &Machine) -> GCodeResult<f64> {
        let name = normalize_name(name);
        if let Some(value) = system(&name, machine) {
            return Ok(value);
        }
        match self.named.get(&name) {
            Some(&value) => Ok(value),
            None => fail(ErrorKind::ParameterUndefined, format!("#<{}>", name)),
        }
    }

    pub fn set_named(&mut self, name: &str, value: f64) -> GCodeResult<()> {
        let name = normalize_name(name);
        if name.is_empty() {
            return fail(ErrorKind::ExpressionSyntaxError, "empty parameter name");
        }
        if is_system(&name) {
            return fail(ErrorKind::ParameterReadOnly, format!("#<{}>", name));
        }
        self.named.insert(name, value);
        Ok(())
    }

    /// Test for presence of a named parameter without evaluating it.
    pub fn exists_named(&self, name: &str) -> bool {
        let name = normalize_name(name);
        self.named.contains_key(&name) || is_system(&name)
    }

    pub fn read(&self, param: &ParamRef, machine: &Machine) -> GCodeResult<f64> {
        match param {
            ParamRef::Numbered(id) => self.get(*id, machine),
            ParamRef::Named(name) => self.get_named(name, machine),
        }
    }

    pub fn write(&mut self, param: &ParamRef, value: f64) -> GCodeResult<()> {
        match param {
            ParamRef::Numbered(id) => self.set(*id, value),
            ParamRef::Named(name) => self.set_named(name, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axes::Axes;

    #[test]
    fn test_numbered() {
        let m = Machine::new();
        let mut p = Parameters::new();
        assert_eq!(p.get(100, &m), Ok(0.));
        p.set(100, 2.5).unwrap();
        assert_eq!(p.get(100, &m), Ok(2.5));
        assert_eq!(p.set(5220, 1.).unwrap_err().kind, ErrorKind::ParameterReadOnly);
        assert_eq!(p.get(5603, &m).unwrap_err().kind, ErrorKind::ExpressionArgumentOutOfRange);
        assert_eq!(p.get(0, &m).unwrap_err().kind, ErrorKind::ExpressionArgumentOutOfRange);
    }

    #[test]
    fn test_computed() {
        let mut m = Machine::new();
        let mut offs = Axes::new();
        offs.set(1, 4.);
        m.set_coordinate_system(CoordSystemId::G55, &offs);
        m.select_coordinate_system(CoordSystemId::G55);
        let p = Parameters::new();
        assert_eq!(p.get(5220, &m), Ok(2.));
        assert_eq!(p.get(5242, &m), Ok(4.));
        assert_eq!(p.get(5421, &m), Ok(-4.));
        assert_eq!(p.get_named("_y", &m), Ok(-4.));
        assert_eq!(p.get_named("_coord_system", &m), Ok(550.));
        assert_eq!(p.get_named("_Metric", &m), Ok(1.));
    }

    #[test]
    fn test_named() {
        let m = Machine::new();
        let mut p = Parameters::new();
        assert_eq!(p.get_named("depth", &m).unwrap_err().kind, ErrorKind::ParameterUndefined);
        p.set_named("De pth", 3.).unwrap();
        assert_eq!(p.get_named("DEPTH", &m), Ok(3.));
        assert!(p.exists_named("depth"));
        assert!(!p.exists_named("width"));
        p.set_named("_global", 1.).unwrap();
        assert_eq!(p.get_named("_global", &m), Ok(1.));
        assert_eq!(p.set_named("_x", 1.).unwrap_err().kind, ErrorKind::ParameterReadOnly);
    }
}
