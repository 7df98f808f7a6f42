// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::fmt;
use std::ops::{Index, IndexMut};
use strum_macros::Display;

/// Number of axes tracked by the machine model.
pub const NUM_AXES: usize = 6;

/// An axis supported by the machine model.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum Axis {
    X, Y, Z,
    A, B, C,
}

impl Axis {
    pub const ALL: [Axis; NUM_AXES] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn from_letter(ch: char) -> Option<Self> {
        Some(match ch.to_ascii_uppercase() {
            'X' => Axis::X,
            'Y' => Axis::Y,
            'Z' => Axis::Z,
            'A' => Axis::A,
            'B' => Axis::B,
            'C' => Axis::C,
            _ => return None
        })
    }

    pub fn letter(self) -> char {
        b"XYZABC"[self.index()] as char
    }

    pub fn is_linear(self) -> bool {
        matches!(self, Axis::X | Axis::Y | Axis::Z)
    }
}

/// Presence bitset for axis (or I/J/K offset) words.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AxisFlags(u8);

impl AxisFlags {
    pub const ALL: AxisFlags = AxisFlags(0b11_1111);

    pub fn set(&mut self, i: usize) {
        self.0 |= 1 << i;
    }

    pub fn contains(self, i: usize) -> bool {
        self.0 & (1 << i) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the set indices.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..NUM_AXES).filter(move |&i| self.contains(i))
    }
}

impl fmt::Debug for AxisFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in self.iter() {
            write!(f, "{}", Axis::ALL[i].letter())?;
        }
        Ok(())
    }
}

/// A six-element axis value vector with the accompanying presence bitset.
///
/// All length measures are in millimeters, angles in degrees.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Axes {
    pub values: [f64; NUM_AXES],
    pub flags: AxisFlags,
}

impl Axes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: [f64; NUM_AXES]) -> Self {
        Axes { values, flags: AxisFlags::ALL }
    }

    pub fn set(&mut self, i: usize, value: f64) {
        self.values[i] = value;
        self.flags.set(i);
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        if self.flags.contains(i) { Some(self.values[i]) } else { None }
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Iterate over `(index, value)` of the flagged axes.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.flags.iter().map(move |i| (i, self.values[i]))
    }
}

impl Index<usize> for Axes {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        &self.values[i]
    }
}

impl IndexMut<usize> for Axes {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.values[i]
    }
}

impl fmt::Debug for Axes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (i, v) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={}", Axis::ALL[i], v)?;
        }
        Ok(())
    }
}

/// A point in 3-D space.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point3 { x, y, z }
    }

    pub fn from_slice(v: &[f64]) -> Self {
        Point3 { x: v[0], y: v[1], z: v[2] }
    }

    pub fn get(&self, i: usize) -> f64 {
        match i {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn set(&mut self, i: usize, v: f64) {
        match i {
            0 => self.x = v,
            1 => self.y = v,
            _ => self.z = v,
        }
    }

    pub fn distance_to(&self, other: &Point3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}
