// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Command tokens: the typed output of the block parser.
//!
//! Tokens are immutable pure data.  All length values are already converted
//! to internal units (millimeters), scaled and diameter-corrected.

use std::fmt;
use std::str::FromStr;

use crate::axes::Axes;
use crate::config::Dialect;
use crate::geometry::EPSILON;

macro_rules! commands {
    ($($name:ident = $letter:literal $code:literal),* $(,)*) => {
        /// A command recognized by the parser.
        ///
        /// G and M commands know their code; `Feedrate`, `SpindleRpm`,
        /// `ToolSelect`, `Comment` and `UserMCommand` stand for the F, S and T
        /// words, comments and M100-M199 respectively.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub enum Command {
            $($name,)*
            Feedrate,
            SpindleRpm,
            ToolSelect,
            Comment,
            UserMCommand,
            Undefined,
        }

        const CODES: &[(Command, char, u16)] = &[
            $((Command::$name, $letter, $code),)*
        ];
    }
}

commands! {
    G0 = 'G' 0, G1 = 'G' 10, G2 = 'G' 20, G3 = 'G' 30, G4 = 'G' 40,
    G5 = 'G' 50, G5_1 = 'G' 51, G7 = 'G' 70, G8 = 'G' 80, G10 = 'G' 100,
    G17 = 'G' 170, G18 = 'G' 180, G19 = 'G' 190, G20 = 'G' 200, G21 = 'G' 210,
    G28 = 'G' 280, G28_1 = 'G' 281, G30 = 'G' 300, G30_1 = 'G' 301,
    G33 = 'G' 330, G38_2 = 'G' 382, G38_3 = 'G' 383, G38_4 = 'G' 384, G38_5 = 'G' 385,
    G40 = 'G' 400, G41 = 'G' 410, G42 = 'G' 420,
    G43 = 'G' 430, G43_1 = 'G' 431, G43_2 = 'G' 432, G49 = 'G' 490,
    G50 = 'G' 500, G51 = 'G' 510, G53 = 'G' 530,
    G54 = 'G' 540, G55 = 'G' 550, G56 = 'G' 560, G57 = 'G' 570, G58 = 'G' 580,
    G59 = 'G' 590, G59_1 = 'G' 591, G59_2 = 'G' 592, G59_3 = 'G' 593,
    G61 = 'G' 610, G61_1 = 'G' 611, G64 = 'G' 640,
    G73 = 'G' 730, G76 = 'G' 760, G80 = 'G' 800, G81 = 'G' 810, G82 = 'G' 820,
    G83 = 'G' 830, G84 = 'G' 840, G85 = 'G' 850, G86 = 'G' 860, G87 = 'G' 870,
    G88 = 'G' 880, G89 = 'G' 890,
    G90 = 'G' 900, G90_1 = 'G' 901, G91 = 'G' 910, G91_1 = 'G' 911,
    G92 = 'G' 920, G92_1 = 'G' 921, G92_2 = 'G' 922, G92_3 = 'G' 923,
    G93 = 'G' 930, G94 = 'G' 940, G95 = 'G' 950, G96 = 'G' 960, G97 = 'G' 970,
    G98 = 'G' 980, G99 = 'G' 990,
    M0 = 'M' 0, M1 = 'M' 10, M2 = 'M' 20, M3 = 'M' 30, M4 = 'M' 40, M5 = 'M' 50,
    M6 = 'M' 60, M7 = 'M' 70, M8 = 'M' 80, M9 = 'M' 90, M30 = 'M' 300,
    M48 = 'M' 480, M49 = 'M' 490, M50 = 'M' 500, M51 = 'M' 510, M52 = 'M' 520,
    M53 = 'M' 530, M56 = 'M' 560, M60 = 'M' 600, M61 = 'M' 610,
    M62 = 'M' 620, M63 = 'M' 630, M64 = 'M' 640, M65 = 'M' 650, M66 = 'M' 660,
    M67 = 'M' 670, M68 = 'M' 680,
}

impl Command {
    /// Look up a G or M command by letter and code times ten.
    pub fn from_code(letter: char, tenths: u32) -> Option<Command> {
        if letter == 'M' && (1000..2000).contains(&tenths) && tenths % 10 == 0 {
            return Some(Command::UserMCommand);
        }
        CODES.iter().find(|&&(_, l, c)| l == letter && c as u32 == tenths).map(|e| e.0)
    }

    /// The letter and code times ten of a G or M command.
    pub fn code(self) -> Option<(char, u16)> {
        CODES.iter().find(|e| e.0 == self).map(|&(_, l, c)| (l, c))
    }

    pub fn is_motion(self) -> bool {
        use Command::*;
        matches!(self, G0 | G1 | G2 | G3 | G5 | G5_1 | G33 | G38_2 | G38_3 | G38_4 | G38_5 |
                 G73 | G76 | G81 | G82 | G83 | G84 | G85 | G86 | G87 | G88 | G89)
    }

    /// Canned drilling cycles, which share the R/Z/L words.
    pub fn is_drill_cycle(self) -> bool {
        use Command::*;
        matches!(self, G73 | G81 | G82 | G83 | G84 | G85 | G86 | G87 | G88 | G89)
    }

    pub fn is_probe(self) -> bool {
        use Command::*;
        matches!(self, G38_2 | G38_3 | G38_4 | G38_5)
    }

    /// Whether the command is available in the given dialect.
    pub fn supported_by(self, dialect: Dialect) -> bool {
        use Command::*;
        let grbl = matches!(self,
            G0 | G1 | G2 | G3 | G4 | G10 | G17 | G18 | G19 | G20 | G21 |
            G28 | G28_1 | G30 | G30_1 | G38_2 | G38_3 | G38_4 | G38_5 |
            G40 | G43_1 | G49 | G53 | G54 | G55 | G56 | G57 | G58 | G59 |
            G61 | G80 | G90 | G91 | G91_1 | G92 | G92_1 | G93 | G94 |
            M0 | M1 | M2 | M3 | M4 | M5 | M7 | M8 | M9 | M30 | M56 |
            Feedrate | SpindleRpm | ToolSelect | Comment);
        match dialect {
            Dialect::Grbl => grbl,
            Dialect::GrblHal => grbl || matches!(self,
                G5 | G5_1 | G7 | G8 | G33 | G43 | G43_2 | G50 | G51 |
                G59_1 | G59_2 | G59_3 | G73 | G76 | G81 | G82 | G83 | G84 | G85 |
                G86 | G87 | G88 | G89 | G90_1 | G92_2 | G92_3 | G95 | G96 | G97 |
                G98 | G99 | M6 | M48 | M49 | M50 | M51 | M52 | M53 |
                M61 | M62 | M63 | M64 | M65 | M66 | M67 | M68 | UserMCommand),
            Dialect::LinuxCnc => !matches!(self, G50 | G51 | M56 | Undefined),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.code() {
            Some((letter, code)) if code % 10 == 0 => write!(f, "{}{}", letter, code / 10),
            Some((letter, code)) => write!(f, "{}{}.{}", letter, code / 10, code % 10),
            None => f.write_str(match self {
                Command::Feedrate => "F",
                Command::SpindleRpm => "S",
                Command::ToolSelect => "T",
                Command::Comment => "Comment",
                Command::UserMCommand => "UserMCommand",
                _ => "Undefined",
            }),
        }
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "F" => return Ok(Command::Feedrate),
            "S" => return Ok(Command::SpindleRpm),
            "T" => return Ok(Command::ToolSelect),
            "Comment" => return Ok(Command::Comment),
            "UserMCommand" => return Ok(Command::UserMCommand),
            "Undefined" => return Ok(Command::Undefined),
            _ => ()
        }
        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(|| s.to_string())?;
        let value: f64 = chars.as_str().parse().map_err(|_| s.to_string())?;
        Command::from_code(letter, (value * 10.).round() as u32)
            .filter(|&c| c != Command::UserMCommand)
            .ok_or_else(|| s.to_string())
    }
}

/// Parameters of a G76 threading cycle.
#[derive(Clone, PartialEq, Debug)]
pub struct ThreadParams {
    /// Final position; only Z is used.
    pub axes: Axes,
    /// Thread pitch.
    pub p: f64,
    /// Thread peak offset from the drive line.
    pub i: f64,
    /// Depth of the first cut.
    pub j: f64,
    /// Full thread depth.
    pub k: f64,
    /// Depth degression.
    pub r: f64,
    /// Compound slide angle in degrees.
    pub q: f64,
    /// Number of spring passes.
    pub h: u32,
    /// Taper length.
    pub e: f64,
    /// Taper mode: 0 none, 1 entry, 2 exit, 3 both.
    pub l: u32,
}

/// Upper limit for the number of passes of a threading cycle.
pub const MAX_THREAD_PASSES: u32 = 10000;

impl ThreadParams {
    /// Number of degressive passes before the full depth is reached, or
    /// `None` if there are too many.
    fn degressive_passes(&self) -> Option<u32> {
        // pass n cuts to J * n^(1/R)
        let n = ((self.k - EPSILON) / self.j).powf(self.r).ceil();
        if !n.is_finite() || n > MAX_THREAD_PASSES as f64 {
            return None;
        }
        Some((n as u32).saturating_sub(1))
    }

    /// Total number of passes, including the full depth and spring passes.
    pub fn pass_count(&self) -> Option<u32> {
        let n = self.degressive_passes()?.checked_add(1)?.checked_add(self.h)?;
        if n <= MAX_THREAD_PASSES { Some(n) } else { None }
    }

    /// Cut depth of every pass.
    pub fn pass_depths(&self) -> Vec<f64> {
        let n = self.degressive_passes().unwrap_or(MAX_THREAD_PASSES);
        let mut depths = (1..=n)
            .map(|n| self.j * (n as f64).powf(1. / self.r))
            .filter(|&depth| depth < self.k - EPSILON)
            .collect::<Vec<_>>();
        let spring = self.h.min(MAX_THREAD_PASSES) as usize;
        depths.extend(std::iter::repeat(self.k).take(1 + spring));
        depths
    }
}

/// The data carried by a token.  Each variant holds only what its commands
/// need.
#[derive(Clone, PartialEq, Debug)]
pub enum TokenData {
    /// Modal switches and other commands without arguments.
    Modal,
    Comment(String),
    /// F and S words.
    Value(f64),
    /// T words, M61 Q, and G43/G43.2 H.
    Tool(u32),
    /// G4 dwell time in seconds.
    Dwell(f64),
    /// A single optional argument word, e.g. D of G41/G96, P of M48-M56.
    Word(char, f64),
    /// Axis words: G0, G1, G38.x, G28, G30, G92, G43.1, G51.
    Axes(Axes),
    /// G53 in combination with G0 or G1.
    MachineMotion { rapid: bool, axes: Axes },
    /// G2/G3, with the center offset in `ijk` (I/J/K as axes 0-2) or a radius.
    Arc { axes: Axes, ijk: Axes, r: Option<f64>, turns: u32 },
    /// G5 (cubic) and G5.1 (quadratic) splines.
    Spline { axes: Axes, i: f64, j: f64, pq: Option<(f64, f64)> },
    /// G33 spindle-synchronized motion with pitch K.
    SyncMotion { axes: Axes, k: f64 },
    /// G73 and G81-G89.  The drilling axis position is always flagged in
    /// `axes`, and sticky words are resolved.
    Drill { axes: Axes, r: f64, l: u32, p: Option<f64>, q: Option<f64> },
    Thread(ThreadParams),
    /// G10 data setting.
    Offsets { l: u32, p: u32, axes: Axes, r: Option<f64> },
    /// G64 blending tolerances.
    PathBlend { p: Option<f64>, q: Option<f64> },
    /// M62-M68.
    Io { p: Option<f64>, e: Option<f64>, l: Option<f64>, q: Option<f64> },
    /// M100-M199.
    UserM { code: u32, p: Option<f64>, q: Option<f64> },
}

/// A command token, emitted by the parser for one command in a block.
#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    /// The block counter of the originating line.
    pub line: usize,
    pub command: Command,
    pub data: TokenData,
}

impl Token {
    pub fn new(line: usize, command: Command, data: TokenData) -> Self {
        Token { line, command, data }
    }

    /// The target axis words, for tokens that have them.
    pub fn axes(&self) -> Option<&Axes> {
        match &self.data {
            TokenData::Axes(axes) |
            TokenData::MachineMotion { axes, .. } |
            TokenData::Arc { axes, .. } |
            TokenData::Spline { axes, .. } |
            TokenData::SyncMotion { axes, .. } |
            TokenData::Drill { axes, .. } |
            TokenData::Offsets { axes, .. } => Some(axes),
            TokenData::Thread(params) => Some(&params.axes),
            _ => None,
        }
    }
}
