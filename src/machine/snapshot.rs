// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The boundary to the live controller.
//!
//! A `ControllerSnapshot` captures what the controller reports about its
//! parser state, coordinate systems, tool table and last probe, and is the
//! only input to `Machine::reset`.  It can be deserialized from TOML or built
//! from Grbl-style `$G` / `$#` report lines.

use std::path::Path;
use serde::Deserialize;
use thiserror::Error;

use crate::axes::NUM_AXES;
use crate::config::ConfigError;
use super::enums::*;
use super::tables::{axis_array, pad_axes, CoordinateSystem, Tool};

#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("Malformed report line: {0}")]
    Malformed(String),
    #[error("Bad number in report: {0}")]
    BadNumber(String),
}

/// Modal parser state as reported by the controller.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct ParserState {
    /// Active motion mode as G-code number times ten (e.g. 10 for G1).
    pub motion: u16,
    pub coord_system: CoordSystemId,
    pub plane: Plane,
    pub units: Units,
    pub distance: DistanceMode,
    pub ijk: IjkMode,
    pub feed_rate_mode: FeedRateMode,
    pub lathe_mode: LatheMode,
    pub spindle: SpindleState,
    pub coolant: CoolantState,
    pub tool: u32,
    pub feed_rate: f64,
    pub rpm: f64,
}

impl Default for ParserState {
    fn default() -> Self {
        ParserState {
            motion: 0,
            coord_system: CoordSystemId::G54,
            plane: Plane::XY,
            units: Units::Metric,
            distance: DistanceMode::Absolute,
            ijk: IjkMode::Incremental,
            feed_rate_mode: FeedRateMode::UnitsPerMin,
            lathe_mode: LatheMode::Disabled,
            spindle: SpindleState::Off,
            coolant: CoolantState::default(),
            tool: 0,
            feed_rate: 0.,
            rpm: 0.,
        }
    }
}

fn parse_num(s: &str) -> Result<f64, ReportError> {
    s.trim().parse().map_err(|_| ReportError::BadNumber(s.into()))
}

fn parse_values(s: &str) -> Result<[f64; NUM_AXES], ReportError> {
    let values = s.split(',').map(parse_num).collect::<Result<Vec<_>, _>>()?;
    if values.len() > NUM_AXES {
        return Err(ReportError::Malformed(s.into()));
    }
    Ok(pad_axes(&values))
}

impl ParserState {
    /// Parse the body of a `[GC:...]` report, e.g.
    /// `G0 G54 G17 G21 G90 G94 M5 M9 T0 F0 S0`.
    pub fn from_report(body: &str) -> Result<Self, ReportError> {
        let mut state = ParserState::default();
        // M7 and M8 may both be reported
        let mut coolant = CoolantState::default();
        for word in body.split_whitespace() {
            let mut chars = word.chars();
            let letter = chars.next().unwrap_or(' ');
            let num = parse_num(chars.as_str())?;
            let code = (num * 10.).round() as u16;
            match letter.to_ascii_uppercase() {
                'G' => match code {
                    0 | 10 | 20 | 30 | 50 | 51 | 330 | 382..=385 | 730 | 760 | 800..=890 =>
                        state.motion = code,
                    540..=593 => if let Some(cs) = CoordSystemId::WORK.iter()
                        .find(|cs| cs.code() == code) {
                            state.coord_system = *cs;
                        },
                    70 => state.lathe_mode = LatheMode::Diameter,
                    80 => state.lathe_mode = LatheMode::Radius,
                    170 => state.plane = Plane::XY,
                    180 => state.plane = Plane::XZ,
                    190 => state.plane = Plane::YZ,
                    200 => state.units = Units::Imperial,
                    210 => state.units = Units::Metric,
                    900 => state.distance = DistanceMode::Absolute,
                    910 => state.distance = DistanceMode::Incremental,
                    901 => state.ijk = IjkMode::Absolute,
                    911 => state.ijk = IjkMode::Incremental,
                    930 => state.feed_rate_mode = FeedRateMode::InverseTime,
                    940 => state.feed_rate_mode = FeedRateMode::UnitsPerMin,
                    950 => state.feed_rate_mode = FeedRateMode::UnitsPerRev,
                    _ => ()
                },
                'M' => match code {
                    30 => state.spindle = SpindleState::Cw,
                    40 => state.spindle = SpindleState::Ccw,
                    50 => state.spindle = SpindleState::Off,
                    70 => coolant.mist = true,
                    80 => coolant.flood = true,
                    _ => ()
                },
                'T' => state.tool = num as u32,
                'F' => state.feed_rate = num,
                'S' => state.rpm = num,
                _ => return Err(ReportError::Malformed(word.into())),
            }
        }
        state.coolant = coolant;
        Ok(state)
    }
}

/// Result of the last probing cycle.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
pub struct ProbeResult {
    #[serde(default, deserialize_with = "axis_array")]
    pub position: [f64; NUM_AXES],
    #[serde(default)]
    pub success: bool,
}

/// Everything the machine model needs from the live controller.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ControllerSnapshot {
    pub parser_state: ParserState,
    pub coord_systems: Vec<CoordinateSystem>,
    pub tools: Vec<Tool>,
    #[serde(deserialize_with = "axis_array")]
    pub tool_length_offset: [f64; NUM_AXES],
    #[serde(deserialize_with = "axis_array")]
    pub machine_position: [f64; NUM_AXES],
    pub probe: Option<ProbeResult>,
}

impl ControllerSnapshot {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let snapshot = Self::from_toml_str(&text)?;
        tracing::info!("Loaded controller snapshot from {}", path.as_ref().display());
        Ok(snapshot)
    }

    /// Build a snapshot from the lines of `$G` and `$#` reports.
    pub fn from_report(text: &str) -> Result<Self, ReportError> {
        let mut snapshot = ControllerSnapshot::default();
        for line in text.lines() {
            snapshot.apply_report_line(line)?;
        }
        Ok(snapshot)
    }

    /// Update the snapshot from one report line.  Lines that are not bracketed
    /// reports (e.g. `ok`) and unknown reports are ignored.
    pub fn apply_report_line(&mut self, line: &str) -> Result<(), ReportError> {
        let line = line.trim();
        let body = match line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            Some(body) => body,
            None => return Ok(()),
        };
        let (tag, data) = body.split_once(':')
            .ok_or_else(|| ReportError::Malformed(line.into()))?;
        match tag {
            "GC" => self.parser_state = ParserState::from_report(data)?,
            "TLO" => {
                let values = data.split(',').map(parse_num).collect::<Result<Vec<_>, _>>()?;
                // Grbl reports only the Z offset
                self.tool_length_offset = if values.len() == 1 {
                    pad_axes(&[0., 0., values[0]])
                } else {
                    pad_axes(&values)
                };
            }
            "PRB" => {
                let (pos, ok) = data.rsplit_once(':')
                    .ok_or_else(|| ReportError::Malformed(line.into()))?;
                self.probe = Some(ProbeResult {
                    position: parse_values(pos)?,
                    success: ok.trim() == "1",
                });
            }
            "T" => {
                let mut parts = data.split('|');
                let number = parts.next().map(parse_num).transpose()?
                    .ok_or_else(|| ReportError::Malformed(line.into()))?;
                let offsets = parts.next().map(parse_values).transpose()?.unwrap_or_default();
                let radius = parts.next().map(parse_num).transpose()?.unwrap_or(0.);
                self.tools.retain(|t| t.number != number as u32);
                self.tools.push(Tool { number: number as u32, offsets, radius });
            }
            _ => {
                let id = CoordSystemId::ALL.iter().find(|cs| cs.to_string() == tag);
                if let Some(&id) = id {
                    let values = parse_values(data)?;
                    self.coord_systems.retain(|cs| cs.id != id);
                    self.coord_systems.push(CoordinateSystem { id, values });
                }
            }
        }
        Ok(())
    }
}

/// Narrow interface for re-synchronizing a model from the live controller.
pub trait Synchronize {
    fn sync(&mut self, snapshot: &ControllerSnapshot);
}
