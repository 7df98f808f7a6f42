// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::fmt;
use strum_macros::IntoStaticStr;
use thiserror::Error;

use crate::config::Dialect;

/// The kind of a parse or evaluation error.
///
/// The variant name doubles as the message key (see `GCodeError::key`).
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoStaticStr)]
pub enum ErrorKind {
    BadNumberFormat,
    ExpressionSyntaxError,
    ExpressionDivideByZero,
    ExpressionInvalidArgument,
    ExpressionArgumentOutOfRange,
    ExpressionInvalidResult,
    ParameterReadOnly,
    ParameterUndefined,
    ParserLetterInvalid,
    ParserCommentError,
    ParserAxisError,
    ParserModalGrpError,
    ParserWordRepeated,
    ParserUnsupportedCmd,
    ParserWordMissing,
    ParserWordInvalid,
    ParserNoAxisWords,
    ParserFeedUndefined,
    ParserPlaneError,
    ParserArcError,
    CycleWordMissing,
    CycleWordInvalid,
}

impl ErrorKind {
    /// The Grbl `error:N` code corresponding to this kind, if there is one.
    pub fn grbl_code(self) -> Option<u16> {
        Some(match self {
            ErrorKind::ParserLetterInvalid => 1,
            ErrorKind::BadNumberFormat => 2,
            ErrorKind::ParserUnsupportedCmd => 20,
            ErrorKind::ParserModalGrpError => 21,
            ErrorKind::ParserFeedUndefined => 22,
            ErrorKind::ParserWordInvalid |
            ErrorKind::CycleWordInvalid => 23,
            ErrorKind::ParserAxisError => 24,
            ErrorKind::ParserWordRepeated => 25,
            ErrorKind::ParserNoAxisWords => 26,
            ErrorKind::ParserWordMissing |
            ErrorKind::CycleWordMissing => 28,
            ErrorKind::ParserArcError => 33,
            _ => return None,
        })
    }

    /// The message key, i.e. the variant name.
    pub fn key(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::BadNumberFormat => "Bad number format",
            ErrorKind::ExpressionSyntaxError => "Syntax error in expression",
            ErrorKind::ExpressionDivideByZero => "Division by zero attempted",
            ErrorKind::ExpressionInvalidArgument => "Invalid argument in expression",
            ErrorKind::ExpressionArgumentOutOfRange => "Argument out of range",
            ErrorKind::ExpressionInvalidResult => "Expression result is not a number",
            ErrorKind::ParameterReadOnly => "Parameter is read-only",
            ErrorKind::ParameterUndefined => "Parameter is not defined",
            ErrorKind::ParserLetterInvalid => "Expected command letter",
            ErrorKind::ParserCommentError => "Malformed comment",
            ErrorKind::ParserAxisError => "Axis words conflict with another command in the block",
            ErrorKind::ParserModalGrpError => "Two commands from the same modal group in block",
            ErrorKind::ParserWordRepeated => "Repeated word in block",
            ErrorKind::ParserUnsupportedCmd => "Unsupported command",
            ErrorKind::ParserWordMissing => "Required value word missing",
            ErrorKind::ParserWordInvalid => "Value word out of range",
            ErrorKind::ParserNoAxisWords => "No axis words in block",
            ErrorKind::ParserFeedUndefined => "Undefined feed rate",
            ErrorKind::ParserPlaneError => "Command not allowed in the active plane",
            ErrorKind::ParserArcError => "Invalid arc specification",
            ErrorKind::CycleWordMissing => "Required cycle word missing",
            ErrorKind::CycleWordInvalid => "Cycle word value invalid",
        })
    }
}

/// An error raised while parsing a block.  It aborts processing of that block
/// only; the caller decides whether to continue with the next one.
#[derive(Clone, PartialEq, Debug, Error)]
#[error("Error in line {line}: {kind}{}", detail_suffix(.detail))]
pub struct GCodeError {
    pub line: usize,
    pub kind: ErrorKind,
    pub detail: String,
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() { String::new() } else { format!(" ({})", detail) }
}

impl GCodeError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        GCodeError { line: 0, kind, detail: detail.into() }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn key(&self) -> &'static str {
        self.kind.key()
    }

    /// Render the message the way the given dialect's controller would
    /// report it.
    pub fn message(&self, dialect: Dialect) -> String {
        let text = format!("{}{}", self.kind, detail_suffix(&self.detail));
        match (dialect, self.kind.grbl_code()) {
            (Dialect::Grbl, Some(code)) |
            (Dialect::GrblHal, Some(code)) => format!("error:{} - {}", code, text),
            _ => text,
        }
    }
}

pub type GCodeResult<T> = Result<T, GCodeError>;

/// Shortcut for returning an error.
pub(crate) fn fail<T>(kind: ErrorKind, detail: impl Into<String>) -> GCodeResult<T> {
    Err(GCodeError::new(kind, detail))
}
