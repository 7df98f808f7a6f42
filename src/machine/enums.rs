// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use serde::Deserialize;
use strum_macros::Display;

/// A plane as selected by G17-G19.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Deserialize)]
pub enum Plane {
    XY, XZ, YZ,
}

impl Default for Plane {
    fn default() -> Self { Plane::XY }
}

impl Plane {
    /// The axis indices of the plane: first and second circular axes, and the
    /// axis normal to the plane.
    ///
    /// Arcs in the XZ plane run from Z to X (the G18 convention), so that the
    /// turn direction is consistent when looking down the normal axis.
    pub fn axes(self) -> (usize, usize, usize) {
        match self {
            Plane::XY => (0, 1, 2),
            Plane::XZ => (2, 0, 1),
            Plane::YZ => (1, 2, 0),
        }
    }

    /// The G-code selecting this plane, times ten.
    pub fn code(self) -> u16 {
        match self {
            Plane::XY => 170,
            Plane::XZ => 180,
            Plane::YZ => 190,
        }
    }
}

/// Length units (G20/G21).  Internally everything is kept in millimeters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Deserialize)]
pub enum Units {
    Metric,
    Imperial,
}

impl Default for Units {
    fn default() -> Self { Units::Metric }
}

impl Units {
    /// Default decimal precision for values in these units.
    pub fn precision(self) -> u32 {
        match self {
            Units::Metric => 3,
            Units::Imperial => 4,
        }
    }
}

/// Distance mode (G90/G91).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Deserialize)]
pub enum DistanceMode {
    Absolute,
    Incremental,
}

impl Default for DistanceMode {
    fn default() -> Self { DistanceMode::Absolute }
}

/// Arc center distance mode (G90.1/G91.1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Deserialize)]
pub enum IjkMode {
    Absolute,
    Incremental,
}

impl Default for IjkMode {
    fn default() -> Self { IjkMode::Incremental }
}

/// Feed rate mode (G93-G95).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Deserialize)]
pub enum FeedRateMode {
    InverseTime,
    UnitsPerMin,
    UnitsPerRev,
}

impl Default for FeedRateMode {
    fn default() -> Self { FeedRateMode::UnitsPerMin }
}

/// Lathe mode (G7/G8).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Deserialize)]
pub enum LatheMode {
    Disabled,
    Radius,
    Diameter,
}

impl Default for LatheMode {
    fn default() -> Self { LatheMode::Disabled }
}

/// Tool length offset mode (G43, G43.1, G43.2, G49).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum ToolLengthOffset {
    Cancelled,
    Enabled,
    Dynamic,
    ApplyAdditional,
}

impl Default for ToolLengthOffset {
    fn default() -> Self { ToolLengthOffset::Cancelled }
}

/// Cutter radius compensation (G40-G42).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum CutterComp {
    Off,
    Left,
    Right,
}

impl Default for CutterComp {
    fn default() -> Self { CutterComp::Off }
}

/// A spindle state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Deserialize)]
pub enum SpindleState {
    Off, Cw, Ccw,
}

impl Default for SpindleState {
    fn default() -> Self { SpindleState::Off }
}

/// A coolant state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Deserialize)]
pub struct CoolantState {
    #[serde(default)]
    pub mist: bool,
    #[serde(default)]
    pub flood: bool,
}

/// Spindle speed mode (G96/G97).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum SpindleRpmMode {
    Rpm,
    Css,
}

impl Default for SpindleRpmMode {
    fn default() -> Self { SpindleRpmMode::Rpm }
}

/// Canned cycle retract mode (G98/G99).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum RetractMode {
    OldZ,
    RPlane,
}

impl Default for RetractMode {
    fn default() -> Self { RetractMode::OldZ }
}

/// A path control mode (G61, G61.1, G64).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum PathMode {
    Exact,
    ExactStop,
    Blending,
}

impl Default for PathMode {
    fn default() -> Self { PathMode::Exact }
}

/// Identifies one of the coordinate systems held by the machine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, Deserialize)]
pub enum CoordSystemId {
    G54, G55, G56, G57, G58, G59,
    #[strum(serialize = "G59.1")]
    #[serde(rename = "G59.1")]
    G59_1,
    #[strum(serialize = "G59.2")]
    #[serde(rename = "G59.2")]
    G59_2,
    #[strum(serialize = "G59.3")]
    #[serde(rename = "G59.3")]
    G59_3,
    G28,
    G30,
    G92,
}

impl Default for CoordSystemId {
    fn default() -> Self { CoordSystemId::G54 }
}

impl CoordSystemId {
    pub const ALL: [CoordSystemId; 12] = [
        CoordSystemId::G54, CoordSystemId::G55, CoordSystemId::G56,
        CoordSystemId::G57, CoordSystemId::G58, CoordSystemId::G59,
        CoordSystemId::G59_1, CoordSystemId::G59_2, CoordSystemId::G59_3,
        CoordSystemId::G28, CoordSystemId::G30, CoordSystemId::G92,
    ];

    /// The work coordinate systems, in P-number order (P1 = G54).
    pub const WORK: [CoordSystemId; 9] = [
        CoordSystemId::G54, CoordSystemId::G55, CoordSystemId::G56,
        CoordSystemId::G57, CoordSystemId::G58, CoordSystemId::G59,
        CoordSystemId::G59_1, CoordSystemId::G59_2, CoordSystemId::G59_3,
    ];

    /// The work coordinate system selected by `G10 L2 Pn` (1-based).
    pub fn from_number(n: u32) -> Option<Self> {
        Self::WORK.get((n as usize).checked_sub(1)?).copied()
    }

    /// The 1-based number of a work coordinate system (0 for the others).
    pub fn number(self) -> u32 {
        Self::WORK.iter().position(|&c| c == self).map_or(0, |i| i as u32 + 1)
    }

    pub fn is_work(self) -> bool {
        self.number() > 0
    }

    /// The G-code selecting this system, times ten.
    pub fn code(self) -> u16 {
        match self {
            CoordSystemId::G54 => 540,
            CoordSystemId::G55 => 550,
            CoordSystemId::G56 => 560,
            CoordSystemId::G57 => 570,
            CoordSystemId::G58 => 580,
            CoordSystemId::G59 => 590,
            CoordSystemId::G59_1 => 591,
            CoordSystemId::G59_2 => 592,
            CoordSystemId::G59_3 => 593,
            CoordSystemId::G28 => 280,
            CoordSystemId::G30 => 300,
            CoordSystemId::G92 => 920,
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&c| c == self).unwrap_or(0)
    }
}
