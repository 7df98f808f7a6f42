// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Rendering tokens back to canonical G-code text.
//!
//! Tokens hold internal (metric, scaled) values, so the renderer tracks the
//! modal state that determines how they were converted and inverts it.

use std::fmt::Write;
use itertools::Itertools;

use crate::axes::{Axes, Axis, NUM_AXES};
use crate::machine::{Conversion, DistanceMode, FeedRateMode, Machine, Units, WordKind};
use crate::token::{Command, Token, TokenData};
use crate::util::{format_num, same_at};

/// Precision for values other than axis words.
const VALUE_PRECISION: u32 = 10;

/// Renders tokens to text.
#[derive(Clone, Debug)]
pub struct Renderer {
    conversion: Conversion,
    inferred: Option<u32>,
    inverse_time: bool,
    incremental: bool,
    compress: bool,
    /// Last commanded absolute value per axis, for motion compression.
    last: [Option<f64>; NUM_AXES],
}

fn axis_kind(command: Command) -> WordKind {
    match command {
        Command::G43_1 => WordKind::Length,
        Command::G51 => WordKind::Raw,
        Command::G10 | Command::G28 | Command::G30 | Command::G53 | Command::G92 => WordKind::Position,
        _ => WordKind::Motion,
    }
}

impl Renderer {
    /// Create a renderer starting from the modal state of `machine`, which
    /// must be the state the tokens were parsed from.
    pub fn new(machine: &Machine) -> Self {
        Renderer {
            conversion: machine.conversion(),
            inferred: machine.inferred_precision(),
            inverse_time: machine.feed_rate_mode == FeedRateMode::InverseTime,
            incremental: machine.distance_mode == DistanceMode::Incremental,
            compress: false,
            last: [None; NUM_AXES],
        }
    }

    /// Use the precision inferred while parsing the tokens.
    pub fn with_precision(mut self, inferred: Option<u32>) -> Self {
        self.inferred = inferred;
        self
    }

    /// Omit axis words of G0/G1 that repeat the last commanded value.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    fn precision(&self) -> u32 {
        let default = if self.conversion.imperial {
            Units::Imperial.precision()
        } else {
            Units::Metric.precision()
        };
        self.inferred.map_or(default, |p| p.max(default))
    }

    fn num(&self, kind: WordKind, axis: usize, value: f64) -> String {
        format_num(self.conversion.to_program(kind, axis, value), VALUE_PRECISION)
    }

    fn write_axes(&mut self, out: &mut String, command: Command, axes: &Axes) {
        let kind = axis_kind(command);
        let precision = self.precision();
        let compress = self.compress && !self.incremental &&
            matches!(command, Command::G0 | Command::G1);
        for (i, v) in axes.iter() {
            if compress && self.last[i].map_or(false, |last| same_at(last, v, precision)) {
                continue;
            }
            let value = self.conversion.to_program(kind, i, v);
            let _ = write!(out, "{}{}", Axis::ALL[i].letter(), format_num(value, precision));
        }
    }

    fn write_opt(&self, out: &mut String, letter: char, kind: WordKind, value: Option<f64>) {
        if let Some(v) = value {
            let _ = write!(out, "{}{}", letter, self.num(kind, 0, v));
        }
    }

    /// Track the last commanded positions for compression.
    fn track(&mut self, token: &Token) {
        match &token.data {
            TokenData::Axes(axes) if matches!(token.command, Command::G0 | Command::G1) => {
                for (i, v) in axes.iter() {
                    self.last[i] = if self.incremental { None } else { Some(v) };
                }
            }
            TokenData::Arc { axes, .. } | TokenData::Spline { axes, .. } |
            TokenData::SyncMotion { axes, .. } => {
                for (i, v) in axes.iter() {
                    self.last[i] = if self.incremental { None } else { Some(v) };
                }
            }
            TokenData::Modal | TokenData::Comment(_) | TokenData::Value(_) |
            TokenData::Dwell(_) | TokenData::Io { .. } | TokenData::UserM { .. }
                if !matches!(token.command, Command::G20 | Command::G21 | Command::G7 |
                             Command::G8 | Command::G50 | Command::G92_1 | Command::G92_2 |
                             Command::G92_3 | Command::G49 | Command::G54 | Command::G55 |
                             Command::G56 | Command::G57 | Command::G58 | Command::G59 |
                             Command::G59_1 | Command::G59_2 | Command::G59_3 |
                             Command::G28_1 | Command::G30_1) => (),
            _ => self.last = [None; NUM_AXES],
        }
    }

    /// Update the modal state affecting conversion.
    fn update(&mut self, token: &Token) {
        match (token.command, &token.data) {
            (Command::G20, _) => self.conversion.imperial = true,
            (Command::G21, _) => self.conversion.imperial = false,
            (Command::G7, _) => self.conversion.diameter = true,
            (Command::G8, _) => self.conversion.diameter = false,
            (Command::G50, _) => self.conversion.scale = [1.; NUM_AXES],
            (Command::G51, TokenData::Axes(axes)) => {
                for (i, v) in axes.iter() {
                    self.conversion.scale[i] = v;
                }
            }
            (Command::G90, _) => self.incremental = false,
            (Command::G91, _) => self.incremental = true,
            (Command::G93, _) => self.inverse_time = true,
            (Command::G94, _) | (Command::G95, _) => self.inverse_time = false,
            (Command::M2, _) | (Command::M30, _) => {
                self.incremental = false;
                self.inverse_time = false;
            }
            _ => ()
        }
    }

    /// Render a single token.  Returns an empty string for a motion whose
    /// words were all compressed away.
    pub fn render(&mut self, token: &Token) -> String {
        let mut out = String::new();
        let cmd = token.command;
        match &token.data {
            TokenData::Modal => { let _ = write!(out, "{}", cmd); }
            TokenData::Comment(text) => {
                if text.contains('(') || text.contains(')') {
                    let _ = write!(out, ";{}", text);
                } else {
                    let _ = write!(out, "({})", text);
                }
            }
            &TokenData::Value(v) => {
                let kind = if cmd == Command::Feedrate && !self.inverse_time {
                    WordKind::Length
                } else {
                    WordKind::Raw
                };
                let _ = write!(out, "{}{}", cmd, self.num(kind, 0, v));
            }
            &TokenData::Tool(n) => {
                let _ = match cmd {
                    Command::ToolSelect => write!(out, "T{}", n),
                    Command::M61 => write!(out, "M61Q{}", n),
                    _ => write!(out, "{}H{}", cmd, n),
                };
            }
            &TokenData::Dwell(p) => {
                let _ = write!(out, "{}P{}", cmd, format_num(p, VALUE_PRECISION));
            }
            &TokenData::Word(letter, v) => {
                let _ = write!(out, "{}{}{}", cmd, letter, self.num(WordKind::Raw, 0, v));
            }
            TokenData::Axes(axes) => {
                let _ = write!(out, "{}", cmd);
                let len = out.len();
                self.write_axes(&mut out, cmd, axes);
                if out.len() == len && self.compress && !axes.is_empty() {
                    out.clear();
                }
            }
            &TokenData::MachineMotion { rapid, ref axes } => {
                let _ = write!(out, "G53{}", if rapid { "G0" } else { "G1" });
                self.write_axes(&mut out, cmd, axes);
            }
            &TokenData::Arc { ref axes, ref ijk, r, turns } => {
                let _ = write!(out, "{}", cmd);
                self.write_axes(&mut out, cmd, axes);
                for (i, v) in ijk.iter() {
                    let _ = write!(out, "{}{}", ['I', 'J', 'K'][i.min(2)], self.num(WordKind::Motion, i, v));
                }
                self.write_opt(&mut out, 'R', WordKind::Length, r);
                if turns != 1 {
                    let _ = write!(out, "P{}", turns);
                }
            }
            &TokenData::Spline { ref axes, i, j, pq } => {
                let _ = write!(out, "{}", cmd);
                self.write_axes(&mut out, cmd, axes);
                let _ = write!(out, "I{}J{}", self.num(WordKind::Motion, 0, i),
                               self.num(WordKind::Motion, 1, j));
                if let Some((p, q)) = pq {
                    let _ = write!(out, "P{}Q{}", self.num(WordKind::Motion, 0, p),
                                   self.num(WordKind::Motion, 1, q));
                }
            }
            &TokenData::SyncMotion { ref axes, k } => {
                let _ = write!(out, "{}", cmd);
                self.write_axes(&mut out, cmd, axes);
                let _ = write!(out, "K{}", self.num(WordKind::Length, 2, k));
            }
            &TokenData::Drill { ref axes, r, l, p, q } => {
                let _ = write!(out, "{}", cmd);
                self.write_axes(&mut out, cmd, axes);
                let _ = write!(out, "R{}", self.num(WordKind::Length, 2, r));
                if l != 1 {
                    let _ = write!(out, "L{}", l);
                }
                self.write_opt(&mut out, 'P', WordKind::Raw, p);
                self.write_opt(&mut out, 'Q', WordKind::Length, q);
            }
            TokenData::Thread(t) => {
                let _ = write!(out, "{}", cmd);
                self.write_axes(&mut out, cmd, &t.axes);
                let _ = write!(out, "P{}I{}J{}K{}", self.num(WordKind::Length, 0, t.p),
                               self.num(WordKind::Length, 0, t.i), self.num(WordKind::Length, 0, t.j),
                               self.num(WordKind::Length, 0, t.k));
                if t.r != 1. {
                    let _ = write!(out, "R{}", format_num(t.r, VALUE_PRECISION));
                }
                if t.q != 0. {
                    let _ = write!(out, "Q{}", format_num(t.q, VALUE_PRECISION));
                }
                if t.h != 0 {
                    let _ = write!(out, "H{}", t.h);
                }
                if t.e != 0. {
                    let _ = write!(out, "E{}", self.num(WordKind::Length, 0, t.e));
                }
                if t.l != 0 {
                    let _ = write!(out, "L{}", t.l);
                }
            }
            &TokenData::Offsets { l, p, ref axes, r } => {
                let _ = write!(out, "{}L{}P{}", cmd, l, p);
                self.write_axes(&mut out, cmd, axes);
                self.write_opt(&mut out, 'R', WordKind::Length, r);
            }
            &TokenData::PathBlend { p, q } => {
                let _ = write!(out, "{}", cmd);
                self.write_opt(&mut out, 'P', WordKind::Length, p);
                self.write_opt(&mut out, 'Q', WordKind::Length, q);
            }
            &TokenData::Io { p, e, l, q } => {
                let _ = write!(out, "{}", cmd);
                self.write_opt(&mut out, 'P', WordKind::Raw, p);
                self.write_opt(&mut out, 'E', WordKind::Raw, e);
                self.write_opt(&mut out, 'L', WordKind::Raw, l);
                self.write_opt(&mut out, 'Q', WordKind::Raw, q);
            }
            &TokenData::UserM { code, p, q } => {
                let _ = write!(out, "M{}", code);
                self.write_opt(&mut out, 'P', WordKind::Raw, p);
                self.write_opt(&mut out, 'Q', WordKind::Raw, q);
            }
        }
        self.track(token);
        self.update(token);
        out
    }

    /// Render the tokens of one block to one line.
    pub fn render_block<'a>(&mut self, tokens: impl IntoIterator<Item = &'a Token>) -> String {
        let tokens = tokens.into_iter().collect_vec();
        // the parser converts all lengths in a block with the block's units
        for token in &tokens {
            match token.command {
                Command::G20 => self.conversion.imperial = true,
                Command::G21 => self.conversion.imperial = false,
                _ => ()
            }
        }
        let mut line = String::new();
        let mut tail = String::new();
        for token in tokens {
            let text = self.render(token);
            // a line comment must come last
            if text.starts_with(';') {
                tail.push_str(&text);
            } else {
                line.push_str(&text);
            }
        }
        line.push_str(&tail);
        line
    }

    /// Render a token list, one line per block.
    pub fn render_program(&mut self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for (_, block) in &tokens.iter().chunk_by(|t| t.line) {
            let line = self.render_block(block);
            // fully compressed motion
            if line.is_empty() {
                continue;
            }
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}
