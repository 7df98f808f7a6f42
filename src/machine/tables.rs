// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use serde::{Deserialize, Deserializer, de::Error as _};

use crate::axes::{AxisFlags, NUM_AXES};
use super::enums::CoordSystemId;

/// Pad a short list of axis values (e.g. from a three-axis controller) to the
/// full axis vector.
pub fn pad_axes(values: &[f64]) -> [f64; NUM_AXES] {
    let mut out = [0.; NUM_AXES];
    for (o, v) in out.iter_mut().zip(values) {
        *o = *v;
    }
    out
}

pub(crate) fn axis_array<'de, D: Deserializer<'de>>(d: D) -> Result<[f64; NUM_AXES], D::Error> {
    let v = Vec::<f64>::deserialize(d)?;
    if v.len() > NUM_AXES {
        return Err(D::Error::invalid_length(v.len(), &"at most 6 axis values"));
    }
    Ok(pad_axes(&v))
}

/// A coordinate system: an id plus one value per axis.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct CoordinateSystem {
    pub id: CoordSystemId,
    #[serde(default, deserialize_with = "axis_array")]
    pub values: [f64; NUM_AXES],
}

impl CoordinateSystem {
    pub fn new(id: CoordSystemId) -> Self {
        CoordinateSystem { id, values: [0.; NUM_AXES] }
    }

    /// Overwrite the flagged axes only.
    pub fn update(&mut self, values: &[f64; NUM_AXES], flags: AxisFlags) {
        for i in flags.iter() {
            self.values[i] = values[i];
        }
    }
}

/// A tool table entry: per-axis length offsets plus a radius.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Tool {
    pub number: u32,
    #[serde(default, deserialize_with = "axis_array")]
    pub offsets: [f64; NUM_AXES],
    #[serde(default)]
    pub radius: f64,
}

impl Tool {
    pub fn new(number: u32) -> Self {
        Tool { number, offsets: [0.; NUM_AXES], radius: 0. }
    }
}

/// The tool table, indexed by tool number.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ToolTable {
    tools: Vec<Tool>,
}

impl ToolTable {
    pub fn new(tools: impl IntoIterator<Item = Tool>) -> Self {
        let mut table = ToolTable::default();
        for tool in tools {
            table.insert(tool);
        }
        table
    }

    pub fn get(&self, number: u32) -> Option<&Tool> {
        self.tools.iter().find(|t| t.number == number)
    }

    /// Get a tool entry for modification, creating it if necessary.
    pub fn entry(&mut self, number: u32) -> &mut Tool {
        let pos = match self.tools.iter().position(|t| t.number == number) {
            Some(pos) => pos,
            None => {
                self.tools.push(Tool::new(number));
                self.tools.len() - 1
            }
        };
        &mut self.tools[pos]
    }

    pub fn insert(&mut self, tool: Tool) {
        let number = tool.number;
        *self.entry(number) = tool;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
