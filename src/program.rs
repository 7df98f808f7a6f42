// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Whole-program processing: parse a text, keep the resulting tokens and
//! replay them.

use std::path::Path;

use crate::bbox::BoundingBox;
use crate::config::ParserConfig;
use crate::emulate::{EmulationIssue, Emulator};
use crate::error::{GCodeError, GCodeResult};
use crate::machine::{ControllerSnapshot, Machine};
use crate::normalize::NormalizedBlock;
use crate::parse::GCodeParser;
use crate::render::Renderer;
use crate::token::Token;
use crate::xml::{self, XmlError};

/// What `Program::load` does with a block that fails to parse.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ErrorPolicy {
    /// Record the error and continue with the next block.
    #[default]
    Skip,
    /// Stop at the first error.
    Abort,
}

/// A parsed G-code program.
#[derive(Clone, Debug)]
pub struct Program {
    snapshot: ControllerSnapshot,
    config: ParserConfig,
    tokens: Vec<Token>,
    blocks: Vec<NormalizedBlock>,
    errors: Vec<GCodeError>,
    precision: Option<u32>,
}

impl Program {
    /// Parse a program, starting from the given controller state.
    pub fn load(text: &str, snapshot: &ControllerSnapshot, config: &ParserConfig,
                policy: ErrorPolicy) -> GCodeResult<Program> {
        let mut machine = Machine::new();
        machine.reset(snapshot);
        let mut parser = GCodeParser::new(&mut machine, config.clone());
        let mut blocks = Vec::new();
        let mut errors = Vec::new();
        for line in text.lines() {
            match parser.parse(line) {
                Ok(block) => blocks.push(block),
                Err(e) => match policy {
                    ErrorPolicy::Abort => return Err(e),
                    ErrorPolicy::Skip => {
                        tracing::warn!("skipping block: {}", e.message(config.dialect));
                        errors.push(e);
                    }
                }
            }
        }
        let tokens = parser.into_tokens();
        tracing::info!("Parsed {} blocks into {} tokens ({} errors)",
                       blocks.len(), tokens.len(), errors.len());
        Ok(Program {
            snapshot: snapshot.clone(),
            config: config.clone(),
            tokens,
            blocks,
            errors,
            precision: machine.inferred_precision(),
        })
    }

    /// Read and parse a program file.
    pub fn load_file(path: impl AsRef<Path>, snapshot: &ControllerSnapshot,
                     config: &ParserConfig, policy: ErrorPolicy) -> Result<Program, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::load(&text, snapshot, config, policy)?)
    }

    /// Build a program from a token list saved with `to_xml`.
    pub fn from_xml(text: &str, snapshot: &ControllerSnapshot,
                    config: &ParserConfig) -> Result<Program, XmlError> {
        Ok(Program {
            snapshot: snapshot.clone(),
            config: config.clone(),
            tokens: xml::from_xml(text)?,
            blocks: Vec::new(),
            errors: Vec::new(),
            precision: None,
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn blocks(&self) -> &[NormalizedBlock] {
        &self.blocks
    }

    /// Errors of skipped blocks.
    pub fn errors(&self) -> &[GCodeError] {
        &self.errors
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &ControllerSnapshot {
        &self.snapshot
    }

    /// The number precision inferred from the program text.
    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    /// Reset `machine` to the program's starting state and emulate.
    pub fn emulate<'m, 't>(&'t self, machine: &'m mut Machine) -> Emulator<'m, 't> {
        machine.reset(&self.snapshot);
        machine.set_inferred_precision(self.precision);
        Emulator::new(machine, &self.tokens)
    }

    /// Compute the extents of the program in work coordinates.
    pub fn extents(&self) -> (BoundingBox, Vec<EmulationIssue>) {
        let mut machine = Machine::new();
        let mut bbox = BoundingBox::new();
        let mut emulator = self.emulate(&mut machine);
        for action in &mut emulator {
            bbox.add_action(&action);
        }
        bbox.conclude();
        (bbox, emulator.into_issues())
    }

    /// Render the tokens back to canonical G-code, one line per block.
    pub fn render(&self, compress: bool) -> String {
        let mut machine = Machine::new();
        machine.reset(&self.snapshot);
        Renderer::new(&machine)
            .with_precision(self.precision)
            .with_compression(compress)
            .render_program(&self.tokens)
    }

    pub fn to_xml(&self) -> Result<String, XmlError> {
        xml::to_xml(&self.tokens)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] GCodeError),
}
