// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The block parser: turns one line of G-code at a time into command tokens.
//!
//! Each block is first split into code and comments (see `normalize`), then
//! scanned for words, and finally executed in the fixed order a controller
//! executes a block.  Every emitted token is applied to the `Machine`
//! immediately, so that later commands in the same block (and parameter
//! reads like `#<_x>`) see the updated state.

mod words;

use crate::axes::{Axes, Axis};
use crate::config::{Dialect, IgnorePolicy, ParserConfig};
use crate::emulate;
use crate::error::{fail, ErrorKind, GCodeError, GCodeResult};
use crate::expr::{self, Parameters};
use crate::machine::{CycleWords, DistanceMode, FeedRateMode, Machine, Plane, Units, WordKind};
use crate::normalize::NormalizedBlock;
use crate::token::{Command, ThreadParams, Token, TokenData};
use crate::util::num_to_int;

use self::words::{Codes, Words};

const MOTION: &[u32] = &[
    0, 10, 20, 30, 50, 51, 330, 382, 383, 384, 385,
    730, 760, 800, 810, 820, 830, 840, 850, 860, 870, 880, 890,
];
const NON_MODAL: &[u32] = &[40, 100, 280, 281, 300, 301, 530, 920, 921, 922, 923];

/// Decides whether a code with the `Prompt` ignore policy is stripped.
pub trait StripPrompt {
    /// Called with the code as written (e.g. `M6`) and the line number.
    /// Returns true to strip the code.
    fn strip(&mut self, code: &str, line: usize) -> bool;
}

impl<F: FnMut(&str, usize) -> bool> StripPrompt for F {
    fn strip(&mut self, code: &str, line: usize) -> bool {
        self(code, line)
    }
}

/// The words and codes found in a block.
struct Scan {
    gcodes: Codes,
    mcodes: Codes,
    words: Words,
    user_m: Option<u32>,
}

/// Parses blocks into a token list, driving a `Machine`.
pub struct GCodeParser<'m> {
    config: ParserConfig,
    machine: &'m mut Machine,
    params: Parameters,
    tokens: Vec<Token>,
    prompt: Option<Box<dyn StripPrompt + 'm>>,
    line: usize,
    /// P and Q of the last cubic spline.
    spline_pq: Option<(f64, f64)>,
}

fn gcode(code: u32) -> Command {
    Command::from_code('G', code).unwrap_or(Command::Undefined)
}

fn mcode(code: u32) -> Command {
    Command::from_code('M', code).unwrap_or(Command::Undefined)
}

fn missing(kind: ErrorKind, what: &str) -> impl FnOnce() -> GCodeError + '_ {
    move || GCodeError::new(kind, what)
}

fn convert(machine: &Machine, kind: WordKind, raw: &Axes) -> Axes {
    let conv = machine.conversion();
    let mut axes = Axes::new();
    for (i, v) in raw.iter() {
        axes.set(i, conv.to_internal(kind, i, v));
    }
    axes
}

fn length(machine: &Machine, value: f64) -> f64 {
    machine.conversion().to_internal(WordKind::Length, 0, value)
}

/// Number of significant fraction digits of a literal number.
fn fraction_digits(literal: &str) -> Option<u32> {
    let literal = literal.trim_start_matches(&['+', '-'][..]);
    if !literal.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let (_, fraction) = literal.split_once('.')?;
    let digits = fraction.trim_end_matches('0').len() as u32;
    if digits > 0 { Some(digits) } else { None }
}

impl<'m> GCodeParser<'m> {
    /// Create a parser for a new session.  The machine should have been reset
    /// from the controller state before.
    pub fn new(machine: &'m mut Machine, config: ParserConfig) -> Self {
        GCodeParser {
            config,
            machine,
            params: Parameters::new(),
            tokens: Vec::new(),
            prompt: None,
            line: 0,
            spline_pq: None,
        }
    }

    /// Set the callback consulted for codes with the `Prompt` policy.
    pub fn with_prompt(mut self, prompt: impl StripPrompt + 'm) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn machine(&self) -> &Machine {
        &*self.machine
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    /// The tokens of all successfully parsed blocks so far.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Parse the next line.
    ///
    /// On error, neither tokens nor machine state changes of the block are
    /// kept, with the exception of parameter assignments preceding the error.
    pub fn parse(&mut self, line: &str) -> GCodeResult<NormalizedBlock> {
        self.line += 1;
        let lineno = self.line;
        let mut block = NormalizedBlock::new(line).map_err(|e| e.at_line(lineno))?;
        block.line = lineno;
        if (block.block_delete && self.config.block_delete) || block.code == "%" {
            block.skipped = true;
            return Ok(block);
        }

        let mut machine = self.machine.clone();
        machine.line = lineno;
        let mut tokens = Vec::new();
        let spline_pq = self.parse_block(&mut block, &mut machine, &mut tokens)
                            .map_err(|e| e.at_line(lineno))?;
        tracing::debug!("Parsed line {} into {} tokens", lineno, tokens.len());
        *self.machine = machine;
        self.spline_pq = spline_pq;
        self.tokens.extend(tokens);
        Ok(block)
    }

    fn strip_policy(&self, command: Command) -> IgnorePolicy {
        match command {
            Command::M6 => self.config.ignore_m6,
            Command::M7 => self.config.ignore_m7,
            Command::M8 => self.config.ignore_m8,
            Command::G61 | Command::G61_1 | Command::G64 => self.config.ignore_g61_g64,
            _ => IgnorePolicy::No,
        }
    }

    fn should_strip(&mut self, command: Command, code: &str, line: usize) -> bool {
        match self.strip_policy(command) {
            IgnorePolicy::No => false,
            IgnorePolicy::Strip => {
                tracing::debug!("Stripping {} in line {}", code, line);
                true
            }
            IgnorePolicy::Prompt => match self.prompt.as_mut() {
                Some(prompt) => prompt.strip(code, line),
                None => {
                    tracing::info!("No prompt available for {} in line {}, keeping it", code, line);
                    false
                }
            }
        }
    }

    /// Collect the words of a block.  Parameter assignments take effect
    /// immediately.
    fn scan(&mut self, block: &mut NormalizedBlock, machine: &mut Machine) -> GCodeResult<Scan> {
        let text = block.code.clone();
        let bytes = text.as_bytes();
        let mut scan = Scan {
            gcodes: Codes::new('G'),
            mcodes: Codes::new('M'),
            words: Words::default(),
            user_m: None,
        };
        let mut pos = 0;
        while pos < bytes.len() {
            let start = pos;
            let letter = bytes[pos] as char;
            if letter == '#' {
                let param = expr::read_parameter_ref(&text, &mut pos, &self.params, machine)?;
                if bytes.get(pos) != Some(&b'=') {
                    return fail(ErrorKind::ExpressionSyntaxError, format!("expected = after {}", param));
                }
                pos += 1;
                let value = expr::evaluate(&text, &mut pos, &self.params, machine)?;
                self.params.write(&param, value)?;
                continue;
            }
            pos += 1;
            match letter {
                'G' | 'M' => {
                    let value = expr::evaluate(&text, &mut pos, &self.params, machine)?;
                    let unsupported = |v: f64| GCodeError::new(
                        ErrorKind::ParserUnsupportedCmd, format!("{}{}", letter, v));
                    let code = num_to_int(value, 1, 20000, unsupported)?;
                    let command = Command::from_code(letter, code)
                        .filter(|c| c.supported_by(self.config.dialect))
                        .ok_or_else(|| unsupported(value))?;
                    if self.should_strip(command, &text[start..pos], machine.line) {
                        block.add_splice(start..pos, "");
                    } else if command == Command::UserMCommand {
                        if scan.user_m.replace(code / 10).is_some() {
                            return fail(ErrorKind::ParserModalGrpError, "more than one user M-code");
                        }
                    } else if letter == 'G' {
                        scan.gcodes.insert(code);
                    } else {
                        scan.mcodes.insert(code);
                    }
                }
                'N' => {
                    expr::evaluate(&text, &mut pos, &self.params, machine)?;
                }
                'O' => return fail(ErrorKind::ParserUnsupportedCmd, "O-word subroutines"),
                _ if Words::is_valid(letter) => {
                    let value = expr::evaluate(&text, &mut pos, &self.params, machine)?;
                    if letter == 'X' {
                        if let Some(digits) = fraction_digits(&text[start + 1..pos]) {
                            machine.infer_precision(digits);
                        }
                    }
                    scan.words.insert(letter, value)?;
                }
                _ => return fail(ErrorKind::ParserLetterInvalid, letter.to_string()),
            }
        }
        Ok(scan)
    }

    /// Execute the words of a block in order.  Returns the new last spline
    /// P/Q words.
    fn parse_block(&mut self, block: &mut NormalizedBlock, machine: &mut Machine,
                   tokens: &mut Vec<Token>) -> GCodeResult<Option<(f64, f64)>> {
        use Command::*;

        let line = machine.line;
        let Scan { mut gcodes, mut mcodes, mut words, user_m } = self.scan(block, machine)?;

        macro_rules! emit {
            ($cmd:expr) => { emit!($cmd, TokenData::Modal) };
            ($cmd:expr, $data:expr) => {{
                let token = Token::new(line, $cmd, $data);
                emulate::advance(machine, &token);
                tokens.push(token);
            }};
        }

        // Determine the commands that can consume axis words first.
        let mut motion = gcodes.modal_group("motion", MOTION)?;
        let non_modal = gcodes.modal_group("non-modal", NON_MODAL)?;
        let tool_length = gcodes.modal_group("tool length offset", &[430, 431, 432, 490])?;
        let scaling = gcodes.modal_group("scaling", &[500, 510])?;

        let has_axes = words.has_axes();
        let axis_users = [
            motion.filter(|&m| m != 800),
            non_modal.filter(|m| [100, 280, 300, 920].contains(m)),
            tool_length.filter(|&t| t == 431),
            scaling.filter(|&s| s == 510),
        ].iter().flatten().count();
        if axis_users > 1 {
            return fail(ErrorKind::ParserAxisError, "more than one command uses axis words");
        }
        if motion == Some(800) && has_axes && axis_users == 0 {
            return fail(ErrorKind::ParserAxisError, "axis words with G80");
        }
        if motion.is_none() && axis_users == 0 && has_axes {
            match machine.motion_mode.code() {
                Some(('G', code)) if machine.motion_mode != G80 => motion = Some(code as u32),
                _ => return fail(ErrorKind::ParserAxisError, "axis words without motion mode"),
            }
        }

        // Lengths in the whole block are converted with the block's units.
        let units = gcodes.modal_group("units", &[200, 210])?;
        match units {
            Some(200) => machine.units = Units::Imperial,
            Some(210) => machine.units = Units::Metric,
            _ => ()
        }
        words.round_axes(machine.precision());

        // #0. Comments and messages.
        for comment in &block.comments {
            emit!(Comment, TokenData::Comment(comment.text.clone()));
        }

        // #1. Feed rate mode (G93-G95).
        if let Some(code) = gcodes.modal_group("feed rate mode", &[930, 940, 950])? {
            emit!(gcode(code));
        }

        // #2. Feed rate.
        let feed_given = words.get('F').is_some();
        if let Some(f) = words.take('F') {
            if f < 0. {
                return fail(ErrorKind::ParserWordInvalid, format!("F{}", f));
            }
            let f = if machine.feed_rate_mode == FeedRateMode::InverseTime { f } else { length(machine, f) };
            emit!(Feedrate, TokenData::Value(f));
        }

        // #3. Spindle speed mode (G96-G97) and speed.
        match gcodes.modal_group("spindle speed mode", &[960, 970])? {
            Some(960) => match words.take('D') {
                Some(d) => emit!(G96, TokenData::Word('D', d)),
                None => emit!(G96),
            },
            Some(_) => emit!(G97),
            None => ()
        }
        if let Some(s) = words.take('S') {
            if s < 0. {
                return fail(ErrorKind::ParserWordInvalid, format!("S{}", s));
            }
            emit!(SpindleRpm, TokenData::Value(s));
        }

        // #4. Tool selection.
        if let Some(t) = words.take_int('T', u32::MAX)? {
            emit!(ToolSelect, TokenData::Tool(t));
        }

        // #5. Tool change (M6, M61).
        match mcodes.modal_group("tool change", &[60, 610])? {
            Some(60) => emit!(M6),
            Some(_) => {
                let q = words.take_int('Q', u32::MAX)?
                             .ok_or_else(missing(ErrorKind::ParserWordMissing, "M61 requires Q"))?;
                emit!(M61, TokenData::Tool(q));
            }
            None => ()
        }

        // #6. Spindle control.
        if let Some(code) = mcodes.modal_group("spindle control", &[30, 40, 50])? {
            emit!(mcode(code));
        }

        // #7. Coolant: M7 and M8 may be combined.
        let (mist, flood, off) = (mcodes.take(70), mcodes.take(80), mcodes.take(90));
        if off && (mist || flood) {
            return fail(ErrorKind::ParserModalGrpError, "coolant control: M9 and M7/M8");
        }
        if mist { emit!(M7); }
        if flood { emit!(M8); }
        if off { emit!(M9); }

        // #8. Overrides.
        if let Some(code) = mcodes.modal_group("overrides", &[480, 490, 500, 510, 520, 530, 560])? {
            let p = if code >= 500 { words.take('P') } else { None };
            match p {
                Some(p) => emit!(mcode(code), TokenData::Word('P', p)),
                None => emit!(mcode(code)),
            }
        }

        // #9. Digital and analog I/O, user M-codes.
        if let Some(code) = mcodes.modal_group("input/output", &[620, 630, 640, 650, 660, 670, 680])? {
            let data = match code {
                620..=650 => TokenData::Io {
                    p: Some(words.require('P', ErrorKind::ParserWordMissing, "digital output")?),
                    e: None, l: None, q: None,
                },
                660 => {
                    let (p, e) = (words.take('P'), words.take('E'));
                    if p.is_none() && e.is_none() {
                        return fail(ErrorKind::ParserWordMissing, "M66 requires P or E");
                    }
                    TokenData::Io { p, e, l: words.take('L'), q: words.take('Q') }
                }
                _ => TokenData::Io {
                    p: None,
                    e: Some(words.require('E', ErrorKind::ParserWordMissing, "analog output")?),
                    l: None,
                    q: Some(words.require('Q', ErrorKind::ParserWordMissing, "analog output")?),
                },
            };
            emit!(mcode(code), data);
        }
        if let Some(code) = user_m {
            emit!(UserMCommand, TokenData::UserM { code, p: words.take('P'), q: words.take('Q') });
        }

        // #10. Dwell.
        if non_modal == Some(40) {
            let p = words.require('P', ErrorKind::ParserWordMissing, "G4")?;
            if p < 0. {
                return fail(ErrorKind::ParserWordInvalid, format!("G4 P{}", p));
            }
            emit!(G4, TokenData::Dwell(p));
        }

        // #11. Plane selection.
        if let Some(code) = gcodes.modal_group("plane", &[170, 180, 190])? {
            emit!(gcode(code));
        }

        // #12. Units and lathe mode.
        if let Some(code) = units {
            emit!(gcode(code));
        }
        if let Some(code) = gcodes.modal_group("lathe mode", &[70, 80])? {
            emit!(gcode(code));
        }

        // #13. Scaling.
        match scaling {
            Some(500) => emit!(G50),
            Some(_) => {
                let mut factors = words.take_axes();
                if let Some(p) = words.take('P') {
                    for i in 0..3 {
                        if factors.get(i).is_none() {
                            factors.set(i, p);
                        }
                    }
                }
                if factors.is_empty() {
                    return fail(ErrorKind::ParserNoAxisWords, "G51");
                }
                if factors.iter().any(|(_, f)| f == 0.) {
                    return fail(ErrorKind::ParserWordInvalid, "scale factor must not be zero");
                }
                emit!(G51, TokenData::Axes(factors));
            }
            None => ()
        }

        // #14. Cutter radius and tool length compensation.
        match gcodes.modal_group("cutter compensation", &[400, 410, 420])? {
            Some(400) => emit!(G40),
            Some(code) => match words.take('D') {
                Some(d) => emit!(gcode(code), TokenData::Word('D', d)),
                None => emit!(gcode(code)),
            },
            None => ()
        }
        match tool_length {
            Some(430) => {
                let h = words.take_int('H', u32::MAX)?.unwrap_or(machine.tool);
                emit!(G43, TokenData::Tool(h));
            }
            Some(431) => {
                let axes = words.take_axes();
                if axes.is_empty() {
                    return fail(ErrorKind::ParserNoAxisWords, "G43.1");
                }
                emit!(G43_1, TokenData::Axes(convert(machine, WordKind::Length, &axes)));
            }
            Some(432) => {
                let h = words.take_int('H', u32::MAX)?
                             .ok_or_else(missing(ErrorKind::ParserWordMissing, "G43.2 requires H"))?;
                emit!(G43_2, TokenData::Tool(h));
            }
            Some(_) => emit!(G49),
            None => ()
        }

        // #15. Coordinate system selection.
        if let Some(code) = gcodes.modal_group("coordinate system", &[
            540, 550, 560, 570, 580, 590, 591, 592, 593,
        ])? {
            emit!(gcode(code));
        }

        // #16. Path control mode.
        match gcodes.modal_group("path control", &[610, 611, 640])? {
            Some(640) => {
                let p = words.take('P').map(|v| length(machine, v));
                let q = words.take('Q').map(|v| length(machine, v));
                emit!(G64, TokenData::PathBlend { p, q });
            }
            Some(code) => emit!(gcode(code)),
            None => ()
        }

        // #17. Distance mode.
        if let Some(code) = gcodes.modal_group("distance mode", &[900, 910])? {
            emit!(gcode(code));
        }
        if let Some(code) = gcodes.modal_group("arc distance mode", &[901, 911])? {
            emit!(gcode(code));
        }

        // #18. Retract mode.
        if let Some(code) = gcodes.modal_group("retract mode", &[980, 990])? {
            emit!(gcode(code));
        }

        // #19. Non-modal commands: G10, G28, G30, G92 and friends.
        let mut machine_coords = false;
        match non_modal {
            Some(100) => {
                let l = words.take_int('L', 100)?
                             .ok_or_else(missing(ErrorKind::ParserWordMissing, "G10 requires L"))?;
                let p = words.take_int('P', u32::MAX)?
                             .ok_or_else(missing(ErrorKind::ParserWordMissing, "G10 requires P"))?;
                match l {
                    2 | 20 if p > 9 => return fail(ErrorKind::ParserWordInvalid, format!("G10 L{} P{}", l, p)),
                    2 | 20 => (),
                    1 | 10 | 11 if self.config.dialect != Dialect::Grbl => (),
                    _ => return fail(ErrorKind::ParserUnsupportedCmd, format!("G10 L{}", l)),
                }
                let r = words.take('R').map(|v| length(machine, v));
                let axes = convert(machine, WordKind::Position, &words.take_axes());
                emit!(G10, TokenData::Offsets { l, p, axes, r });
            }
            Some(code @ 280) | Some(code @ 300) => {
                let axes = convert(machine, WordKind::Position, &words.take_axes());
                emit!(gcode(code), TokenData::Axes(axes));
            }
            Some(920) => {
                let axes = words.take_axes();
                if axes.is_empty() {
                    return fail(ErrorKind::ParserNoAxisWords, "G92");
                }
                emit!(G92, TokenData::Axes(convert(machine, WordKind::Position, &axes)));
            }
            Some(530) => machine_coords = true,
            Some(40) | None => (),
            Some(code) => emit!(gcode(code)),
        }

        // #20. Motion.
        let mut spline_pq = self.spline_pq;
        if let Some(code) = motion {
            let command = gcode(code);
            if machine_coords && !matches!(command, G0 | G1) {
                return fail(ErrorKind::ParserUnsupportedCmd, "G53 requires G0 or G1");
            }
            let needs_feed = matches!(command, G1 | G2 | G3 | G5 | G5_1) ||
                command.is_probe() || command.is_drill_cycle();
            if needs_feed && (has_axes || command != G1) {
                if machine.feed_rate_mode == FeedRateMode::InverseTime && !feed_given {
                    return fail(ErrorKind::ParserFeedUndefined, "inverse time mode requires F");
                }
                if machine.feed_rate <= 0. {
                    return fail(ErrorKind::ParserFeedUndefined, format!("{}", command));
                }
            }
            let last_pq = if machine.motion_mode == G5 { self.spline_pq } else { None };
            spline_pq = None;
            match command {
                G0 | G1 if machine_coords => {
                    let axes = convert(machine, WordKind::Position, &words.take_axes());
                    emit!(G53, TokenData::MachineMotion { rapid: command == G0, axes });
                }
                G2 | G3 => {
                    let data = arc_data(machine, &mut words)?;
                    emit!(command, data);
                }
                G5 | G5_1 => {
                    let data = spline_data(machine, &mut words, command, last_pq)?;
                    if let TokenData::Spline { pq, .. } = &data {
                        spline_pq = *pq;
                    }
                    emit!(command, data);
                }
                G33 => {
                    let k = words.require('K', ErrorKind::ParserWordMissing, "G33")?;
                    let axes = convert(machine, WordKind::Motion, &words.take_axes());
                    emit!(G33, TokenData::SyncMotion { axes, k: length(machine, k) });
                }
                G76 => {
                    let data = thread_data(machine, &mut words)?;
                    emit!(G76, data);
                }
                G80 => emit!(G80),
                _ if command.is_drill_cycle() => {
                    let data = drill_data(machine, &mut words, command)?;
                    emit!(command, data);
                }
                _ => {
                    let axes = convert(machine, WordKind::Motion, &words.take_axes());
                    if command.is_probe() && axes.is_empty() {
                        return fail(ErrorKind::ParserNoAxisWords, format!("{}", command));
                    }
                    emit!(command, TokenData::Axes(axes));
                }
            }
            if !command.is_drill_cycle() {
                machine.cycle = CycleWords::default();
            }
        }

        // #21. Program flow.
        if let Some(code) = mcodes.modal_group("stopping", &[0, 10, 20, 300, 600])? {
            emit!(mcode(code));
        }

        Ok(spline_pq)
    }
}

/// Arcs (G2/G3): center offsets or radius in the active plane.
fn arc_data(machine: &Machine, words: &mut Words) -> GCodeResult<TokenData> {
    let (a0, a1, normal) = machine.plane.axes();
    let conv = machine.conversion();
    let mut ijk = Axes::new();
    for (i, letter) in ['I', 'J', 'K'].into_iter().enumerate() {
        if let Some(v) = words.take(letter) {
            if i == normal {
                return fail(ErrorKind::ParserArcError, format!("{} word in plane {}", letter, machine.plane));
            }
            ijk.set(i, conv.to_internal(WordKind::Motion, i, v));
        }
    }
    let r = words.take('R').map(|v| conv.to_internal(WordKind::Length, 0, v));
    let axes = convert(machine, WordKind::Motion, &words.take_axes());
    match (ijk.is_empty(), r) {
        (true, None) => return fail(ErrorKind::ParserArcError, "IJK or R required"),
        (false, Some(_)) => return fail(ErrorKind::ParserArcError, "both IJK and R given"),
        (true, Some(r)) if r == 0. => return fail(ErrorKind::ParserArcError, "zero radius"),
        (true, Some(_)) if axes.get(a0).is_none() && axes.get(a1).is_none() =>
            return fail(ErrorKind::ParserArcError, "radius format requires an end point in the plane"),
        _ => ()
    }
    let turns = words.take_int('P', 10000)?.unwrap_or(1);
    if turns == 0 {
        return fail(ErrorKind::ParserWordInvalid, "P0 for arc");
    }
    Ok(TokenData::Arc { axes, ijk, r, turns })
}

/// Splines (G5/G5.1), only in the XY plane.
fn spline_data(machine: &Machine, words: &mut Words, command: Command,
               last_pq: Option<(f64, f64)>) -> GCodeResult<TokenData> {
    if machine.plane != Plane::XY {
        return fail(ErrorKind::ParserPlaneError, format!("{} requires the XY plane", command));
    }
    let conv = machine.conversion();
    let x = |v: f64| conv.to_internal(WordKind::Motion, 0, v);
    let y = |v: f64| conv.to_internal(WordKind::Motion, 1, v);
    let (i, j) = (words.take('I'), words.take('J'));
    let axes = convert(machine, WordKind::Motion, &words.take_axes());
    if command == Command::G5_1 {
        if i.is_none() && j.is_none() {
            return fail(ErrorKind::ParserWordMissing, "G5.1 requires I or J");
        }
        return Ok(TokenData::Spline { axes, i: x(i.unwrap_or(0.)), j: y(j.unwrap_or(0.)), pq: None });
    }
    let p = words.require('P', ErrorKind::ParserWordMissing, "G5")?;
    let q = words.require('Q', ErrorKind::ParserWordMissing, "G5")?;
    let (i, j) = match (i, j, last_pq) {
        (Some(i), Some(j), _) => (x(i), y(j)),
        // continue tangentially from the previous spline
        (None, None, Some((lp, lq))) => (-lp, -lq),
        _ => return fail(ErrorKind::ParserWordMissing, "G5 requires I and J"),
    };
    Ok(TokenData::Spline { axes, i, j, pq: Some((x(p), y(q))) })
}

fn cycle_int(value: f64, letter: char, max: u32) -> GCodeResult<u32> {
    num_to_int(value, 0, max, |v| GCodeError::new(
        ErrorKind::CycleWordInvalid, format!("{}{}", letter, v)))
}

/// Canned drilling cycles.  R, the drilling depth, P and Q are sticky.
fn drill_data(machine: &mut Machine, words: &mut Words, command: Command) -> GCodeResult<TokenData> {
    use Command::*;

    if !machine.motion_mode.is_drill_cycle() {
        machine.cycle = CycleWords::default();
    }
    let (_, _, normal) = machine.plane.axes();
    let normal_letter = Axis::ALL[normal].letter();
    let conv = machine.conversion();
    let mut axes = convert(machine, WordKind::Motion, &words.take_axes());
    let depth = match axes.get(normal) {
        Some(depth) => depth,
        None => machine.cycle.depth.ok_or_else(|| GCodeError::new(
            ErrorKind::CycleWordMissing, format!("{} requires {}", command, normal_letter)))?,
    };
    axes.set(normal, depth);
    let r = match words.take('R') {
        Some(r) => conv.to_internal(WordKind::Length, normal, r),
        None => machine.cycle.r.ok_or_else(missing(ErrorKind::CycleWordMissing, "cycle requires R"))?,
    };
    let l = match words.take('L') {
        Some(l) => cycle_int(l, 'L', 100000)?,
        None => 1,
    };
    if l == 0 {
        return fail(ErrorKind::CycleWordInvalid, "L0");
    }
    let p = if matches!(command, G82 | G86 | G88 | G89) {
        let p = words.take('P').or(machine.cycle.p);
        if p.is_none() && matches!(command, G82 | G89) {
            return fail(ErrorKind::CycleWordMissing, format!("{} requires P", command));
        }
        if p.map_or(false, |p| p < 0.) {
            return fail(ErrorKind::CycleWordInvalid, "P must not be negative");
        }
        p
    } else {
        None
    };
    let q = if matches!(command, G73 | G83) {
        let q = match words.take('Q') {
            Some(q) => conv.to_internal(WordKind::Length, normal, q),
            None => machine.cycle.q.ok_or_else(missing(ErrorKind::CycleWordMissing, "peck cycle requires Q"))?,
        };
        if q <= 0. {
            return fail(ErrorKind::CycleWordInvalid, "Q must be positive");
        }
        Some(q)
    } else {
        None
    };
    machine.cycle = CycleWords {
        depth: Some(depth),
        r: Some(r),
        p: p.or(machine.cycle.p),
        q: q.or(machine.cycle.q),
    };
    Ok(TokenData::Drill { axes, r, l, p, q })
}

/// The G76 threading cycle.
fn thread_data(machine: &Machine, words: &mut Words) -> GCodeResult<TokenData> {
    if machine.plane != Plane::XZ {
        return fail(ErrorKind::ParserPlaneError, "G76 requires the XZ plane");
    }
    let need = |words: &mut Words, letter: char| words.take(letter).ok_or_else(|| GCodeError::new(
        ErrorKind::CycleWordMissing, format!("G76 requires {}", letter)));
    let invalid = |what: &str| fail(ErrorKind::CycleWordInvalid, what.to_string());

    let axes = convert(machine, WordKind::Motion, &words.take_axes());
    let z = axes.get(2).ok_or_else(missing(ErrorKind::CycleWordMissing, "G76 requires Z"))?;
    let p = length(machine, need(words, 'P')?);
    let i = length(machine, need(words, 'I')?);
    let j = length(machine, need(words, 'J')?);
    let k = length(machine, need(words, 'K')?);
    let r = words.take_def('R', 1.);
    let q = words.take_def('Q', 0.);
    let h = match words.take('H') {
        Some(h) => cycle_int(h, 'H', 100000)?,
        None => 0,
    };
    let e = length(machine, words.take_def('E', 0.));
    let l = match words.take('L') {
        Some(l) => cycle_int(l, 'L', 4)?,
        None => 0,
    };

    if p <= 0. {
        return invalid("P must be positive");
    }
    if i == 0. {
        return invalid("I must not be zero");
    }
    if j <= 0. {
        return invalid("J must be positive");
    }
    if k <= j {
        return invalid("K must be greater than J");
    }
    if r < 1. {
        return invalid("R must be at least 1");
    }
    if !(0. ..90.).contains(&q) {
        return invalid("Q must be in [0, 90)");
    }
    if e < 0. {
        return invalid("E must not be negative");
    }
    if l != 0 && e <= 0. {
        return invalid("tapers require E");
    }
    let start = machine.position()[2];
    let end = if machine.distance_mode == DistanceMode::Incremental { start + z } else { z };
    let tapers = match l {
        0 => 0.,
        3 => 2.,
        _ => 1.,
    };
    if tapers * e > (end - start).abs() {
        return invalid("tapers are longer than the thread");
    }
    let params = ThreadParams { axes, p, i, j, k, r, q, h, e, l };
    if params.pass_count().is_none() {
        return invalid("too many passes");
    }
    Ok(TokenData::Thread(params))
}
