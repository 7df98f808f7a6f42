// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use fixedbitset::FixedBitSet as BitSet;

use crate::axes::{Axes, Axis};
use crate::error::{ErrorKind, GCodeError, GCodeResult};
use crate::util::{num_to_int, round_to};

/// Helper for flagging and retrieving G or M codes of a block.  Codes are
/// stored as ten times their value.
pub(crate) struct Codes {
    set: BitSet,
    letter: char,
}

impl Codes {
    pub fn new(letter: char) -> Self {
        Codes { set: BitSet::with_capacity(1000), letter }
    }

    pub fn insert(&mut self, code: u32) {
        self.set.insert(code as usize);
    }

    pub fn contains(&self, code: u32) -> bool {
        self.set.contains(code as usize)
    }

    /// Remove a single code, returning whether it was present.
    pub fn take(&mut self, code: u32) -> bool {
        let present = self.contains(code);
        self.set.set(code as usize, false);
        present
    }

    fn name(&self, code: u32) -> String {
        if code % 10 == 0 {
            format!("{}{}", self.letter, code / 10)
        } else {
            format!("{}{}.{}", self.letter, code / 10, code % 10)
        }
    }

    /// Remove and return the code of the given modal group.  More than one
    /// code of the group is an error.
    pub fn modal_group(&mut self, name: &'static str, codes: &[u32]) -> GCodeResult<Option<u32>> {
        let mut found = None;
        for &code in codes {
            if self.contains(code) {
                if let Some(&other) = codes.iter().find(|&&c| self.contains(c) && c != code) {
                    return Err(GCodeError::new(ErrorKind::ParserModalGrpError, format!(
                        "{}: {} and {}", name, self.name(code), self.name(other))));
                }
                found = Some(code);
            }
        }
        for &code in codes {
            self.set.set(code as usize, false);
        }
        Ok(found)
    }

    pub fn get_first(&self) -> Option<u32> {
        self.set.ones().next().map(|c| c as u32)
    }
}

/// Helper for the value words of a block, indexed by letter.
#[derive(Default)]
pub(crate) struct Words([Option<f64>; 26]);

fn index(letter: char) -> usize {
    (letter as u8 - b'A') as usize
}

impl Words {
    /// Letters that may appear as value words.
    pub fn is_valid(letter: char) -> bool {
        matches!(letter, 'A'..='F' | 'H'..='L' | 'P'..='T' | 'X'..='Z')
    }

    pub fn insert(&mut self, letter: char, value: f64) -> GCodeResult<()> {
        let slot = &mut self.0[index(letter)];
        if slot.is_some() {
            return Err(GCodeError::new(ErrorKind::ParserWordRepeated, letter.to_string()));
        }
        *slot = Some(value);
        Ok(())
    }

    pub fn get(&self, letter: char) -> Option<f64> {
        self.0[index(letter)]
    }

    pub fn take(&mut self, letter: char) -> Option<f64> {
        self.0[index(letter)].take()
    }

    pub fn take_def(&mut self, letter: char, def: f64) -> f64 {
        self.take(letter).unwrap_or(def)
    }

    /// Take a word that must be a nonnegative integer below `max`.
    pub fn take_int(&mut self, letter: char, max: u32) -> GCodeResult<Option<u32>> {
        self.take(letter).map(|f| num_to_int(f, 0, max, |n| GCodeError::new(
            ErrorKind::ParserWordInvalid, format!("{}{}", letter, n)))).transpose()
    }

    pub fn take_int_def(&mut self, letter: char, def: u32, max: u32) -> GCodeResult<u32> {
        self.take_int(letter, max).map(|v| v.unwrap_or(def))
    }

    /// Take a word that is required.
    pub fn require(&mut self, letter: char, kind: ErrorKind, what: &str) -> GCodeResult<f64> {
        self.take(letter).ok_or_else(|| GCodeError::new(kind, format!("{} requires {}", what, letter)))
    }

    pub fn has_axes(&self) -> bool {
        Axis::ALL.iter().any(|a| self.get(a.letter()).is_some())
    }

    /// Round the axis words to the given number of decimals.
    pub fn round_axes(&mut self, precision: u32) {
        for axis in Axis::ALL {
            if let Some(v) = &mut self.0[index(axis.letter())] {
                *v = round_to(*v, precision);
            }
        }
    }

    /// Take all axis words.
    pub fn take_axes(&mut self) -> Axes {
        let mut axes = Axes::new();
        for axis in Axis::ALL {
            if let Some(v) = self.take(axis.letter()) {
                axes.set(axis.index(), v);
            }
        }
        axes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_group() {
        let mut codes = Codes::new('G');
        codes.insert(10);
        codes.insert(170);
        assert_eq!(codes.modal_group("motion", &[0, 10, 20]).unwrap(), Some(10));
        assert_eq!(codes.modal_group("motion", &[0, 10, 20]).unwrap(), None);
        codes.insert(0);
        codes.insert(20);
        let err = codes.modal_group("motion", &[0, 10, 20]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParserModalGrpError);
        assert_eq!(err.detail, "motion: G0 and G2");
        assert_eq!(codes.get_first(), Some(170));
    }

    #[test]
    fn test_words() {
        let mut words = Words::default();
        words.insert('X', 1.).unwrap();
        assert_eq!(words.insert('X', 2.).unwrap_err().kind, ErrorKind::ParserWordRepeated);
        words.insert('L', 2.5).unwrap();
        assert!(words.has_axes());
        assert_eq!(words.take_int('L', 10).unwrap_err().kind, ErrorKind::ParserWordInvalid);
        let axes = words.take_axes();
        assert_eq!(axes.get(0), Some(1.));
        assert!(!words.has_axes());
        assert!(!Words::is_valid('G') && !Words::is_valid('N') && !Words::is_valid('U'));
    }
}
