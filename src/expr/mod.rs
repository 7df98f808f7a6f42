// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The expression evaluator.
//!
//! Expressions are evaluated directly from the normalized (upper case,
//! whitespace-free) code text of a block, with an explicit operator
//! precedence stack.  Parameter references are resolved against a
//! `Parameters` store and the `Machine` for read-only values.

mod params;

use std::str::FromStr;
use strum_macros::EnumString;

use crate::error::{fail, ErrorKind, GCodeError, GCodeResult};
use crate::machine::Machine;
use crate::util::num_to_int;

pub use self::params::*;

/// Maximum depth of the operator stack.
const MAX_STACK: usize = 7;

/// Tolerance for the EQ and NE operators.
const EQ_TOLERANCE: f64 = 0.001;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Op {
    RightBracket,
    Power,
    Times,
    Divide,
    Modulo,
    Plus,
    Minus,
    And,
    Xor,
    Or,
    Lt,
    Eq,
    Ne,
    Le,
    Ge,
    Gt,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::RightBracket => 1,
            Op::And | Op::Xor | Op::Or => 2,
            Op::Lt | Op::Eq | Op::Ne | Op::Le | Op::Ge | Op::Gt => 3,
            Op::Plus | Op::Minus => 4,
            Op::Times | Op::Divide | Op::Modulo => 5,
            Op::Power => 6,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
enum Function {
    Abs, Acos, Asin, Atan, Cos, Exists, Exp, Fix, Fup, Ln, Round, Sin, Sqrt, Tan,
}

fn flag(b: bool) -> f64 {
    if b { 1. } else { 0. }
}

fn check_result(v: f64) -> GCodeResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        fail(ErrorKind::ExpressionInvalidResult, "")
    }
}

fn binary(left: f64, op: Op, right: f64) -> GCodeResult<f64> {
    let result = match op {
        Op::Power => {
            if left < 0. && right.fract() != 0. {
                return fail(ErrorKind::ExpressionInvalidArgument,
                            "negative base with fractional exponent");
            }
            left.powf(right)
        }
        Op::Times => left * right,
        Op::Divide => if right == 0. {
            return fail(ErrorKind::ExpressionDivideByZero, "")
        } else { left / right },
        Op::Modulo => if right == 0. {
            return fail(ErrorKind::ExpressionDivideByZero, "")
        } else {
            let r = left % right;
            if r < 0. { r + right.abs() } else { r }
        },
        Op::Plus => left + right,
        Op::Minus => left - right,
        Op::And => flag(left != 0. && right != 0.),
        Op::Or  => flag(left != 0. || right != 0.),
        Op::Xor => flag((left != 0.) ^ (right != 0.)),
        Op::Eq  => flag((left - right).abs() < EQ_TOLERANCE),
        Op::Ne  => flag((left - right).abs() >= EQ_TOLERANCE),
        Op::Lt  => flag(left < right),
        Op::Le  => flag(left <= right),
        Op::Gt  => flag(left > right),
        Op::Ge  => flag(left >= right),
        Op::RightBracket => return fail(ErrorKind::ExpressionSyntaxError, "unexpected ]"),
    };
    check_result(result)
}

fn unary(func: Function, arg: f64) -> GCodeResult<f64> {
    let out_of_range = |what: &str| fail(ErrorKind::ExpressionArgumentOutOfRange,
                                         format!("{} of {}", what, arg));
    let result = match func {
        Function::Abs => arg.abs(),
        Function::Acos => {
            if !(-1. ..=1.).contains(&arg) {
                return out_of_range("ACOS");
            }
            arg.acos().to_degrees()
        }
        Function::Asin => {
            if !(-1. ..=1.).contains(&arg) {
                return out_of_range("ASIN");
            }
            arg.asin().to_degrees()
        }
        Function::Cos => arg.to_radians().cos(),
        Function::Exp => arg.exp(),
        Function::Fix => arg.floor(),
        Function::Fup => arg.ceil(),
        Function::Ln => {
            if arg <= 0. {
                return out_of_range("LN");
            }
            arg.ln()
        }
        Function::Round => arg.round(),
        Function::Sin => arg.to_radians().sin(),
        Function::Sqrt => {
            if arg < 0. {
                return out_of_range("SQRT");
            }
            arg.sqrt()
        }
        Function::Tan => arg.to_radians().tan(),
        Function::Atan | Function::Exists =>
            return fail(ErrorKind::ExpressionSyntaxError, "not a unary function"),
    };
    check_result(result)
}

/// Reader over the code text of one block.
struct Evaluator<'a> {
    text: &'a [u8],
    pos: usize,
    params: &'a Parameters,
    machine: &'a Machine,
}

impl<'a> Evaluator<'a> {
    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn expect(&mut self, ch: u8) -> GCodeResult<()> {
        if self.peek() == Some(ch) {
            self.pos += 1;
            Ok(())
        } else {
            fail(ErrorKind::ExpressionSyntaxError,
                 format!("expected {} at position {}", ch as char, self.pos + 1))
        }
    }

    /// A "real value": a number, bracketed expression, parameter, unary
    /// sign, or function call.
    fn real_value(&mut self) -> GCodeResult<f64> {
        match self.peek() {
            Some(b'[') => self.expression(),
            Some(b'#') => self.parameter(),
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.real_value()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.real_value()
            }
            Some(ch) if ch.is_ascii_alphabetic() => self.function(),
            Some(_) => self.number(),
            None => fail(ErrorKind::BadNumberFormat, "missing value"),
        }
    }

    fn number(&mut self) -> GCodeResult<f64> {
        let start = self.pos;
        let mut digits = 0;
        let mut dot = false;
        while let Some(ch) = self.peek() {
            match ch {
                b'0'..=b'9' => digits += 1,
                b'.' if !dot => dot = true,
                _ => break
            }
            self.pos += 1;
        }
        if digits == 0 {
            return fail(ErrorKind::BadNumberFormat, format!("at position {}", start + 1));
        }
        // the slice consists of ASCII digits and at most one dot
        std::str::from_utf8(&self.text[start..self.pos]).ok()
            .and_then(|s| s.parse().ok())
            .map_or_else(|| fail(ErrorKind::BadNumberFormat, ""), Ok)
    }

    /// Evaluate a bracketed expression, with the cursor on the `[`.
    fn expression(&mut self) -> GCodeResult<f64> {
        self.expect(b'[')?;
        let mut values = [0f64; MAX_STACK];
        let mut ops = [Op::RightBracket; MAX_STACK];
        let mut index = 0;

        values[0] = self.real_value()?;
        ops[0] = self.operation()?;
        while ops[index] != Op::RightBracket {
            if index + 1 >= MAX_STACK {
                return fail(ErrorKind::ExpressionSyntaxError, "expression too complex");
            }
            values[index + 1] = self.real_value()?;
            ops[index + 1] = self.operation()?;
            if ops[index + 1].precedence() > ops[index].precedence() {
                index += 1;
                continue;
            }
            // reduce while the next operator does not bind tighter
            loop {
                values[index] = binary(values[index], ops[index], values[index + 1])?;
                ops[index] = ops[index + 1];
                if index > 0 && ops[index].precedence() <= ops[index - 1].precedence() {
                    index -= 1;
                } else {
                    break;
                }
            }
        }
        Ok(values[0])
    }

    fn operation(&mut self) -> GCodeResult<Op> {
        let rest = &self.text[self.pos..];
        let (op, len) = match rest {
            [b'*', b'*', ..] => (Op::Power, 2),
            [b'*', ..] => (Op::Times, 1),
            [b'/', ..] => (Op::Divide, 1),
            [b'+', ..] => (Op::Plus, 1),
            [b'-', ..] => (Op::Minus, 1),
            [b']', ..] => (Op::RightBracket, 1),
            [b'M', b'O', b'D', ..] => (Op::Modulo, 3),
            [b'A', b'N', b'D', ..] => (Op::And, 3),
            [b'X', b'O', b'R', ..] => (Op::Xor, 3),
            [b'O', b'R', ..] => (Op::Or, 2),
            [b'E', b'Q', ..] => (Op::Eq, 2),
            [b'N', b'E', ..] => (Op::Ne, 2),
            [b'L', b'T', ..] => (Op::Lt, 2),
            [b'L', b'E', ..] => (Op::Le, 2),
            [b'G', b'T', ..] => (Op::Gt, 2),
            [b'G', b'E', ..] => (Op::Ge, 2),
            [] => return fail(ErrorKind::ExpressionSyntaxError, "unclosed bracket"),
            _ => return fail(ErrorKind::ExpressionSyntaxError,
                             format!("unknown operation at position {}", self.pos + 1)),
        };
        self.pos += len;
        Ok(op)
    }

    fn function(&mut self) -> GCodeResult<f64> {
        let start = self.pos;
        while self.peek().map_or(false, |ch| ch.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name = String::from_utf8_lossy(&self.text[start..self.pos]);
        let func = Function::from_str(&name).map_err(|_| {
            GCodeError::new(ErrorKind::ExpressionSyntaxError,
                                          format!("unknown function {}", name))
        })?;
        match func {
            Function::Atan => {
                let y = self.expression()?;
                self.expect(b'/')?;
                let x = self.expression()?;
                check_result(y.atan2(x).to_degrees())
            }
            Function::Exists => {
                self.expect(b'[')?;
                if self.text.get(self.pos..self.pos + 2) != Some(b"#<") {
                    return fail(ErrorKind::ExpressionInvalidArgument,
                                "EXISTS requires a named parameter");
                }
                self.pos += 1;
                let name = self.name()?;
                self.expect(b']')?;
                Ok(flag(self.params.exists_named(&name)))
            }
            _ => {
                let arg = self.expression()?;
                unary(func, arg)
            }
        }
    }

    /// Read a `<name>` with the cursor on the `<`.
    fn name(&mut self) -> GCodeResult<String> {
        self.expect(b'<')?;
        let start = self.pos;
        while self.peek().map_or(false, |ch| ch != b'>') {
            self.pos += 1;
        }
        let name = String::from_utf8_lossy(&self.text[start..self.pos]).into_owned();
        self.expect(b'>')?;
        if name.is_empty() {
            return fail(ErrorKind::ExpressionSyntaxError, "empty parameter name");
        }
        Ok(normalize_name(&name))
    }

    /// Read a parameter reference with the cursor on the `#`.
    fn parameter_ref(&mut self) -> GCodeResult<ParamRef> {
        self.expect(b'#')?;
        if self.peek() == Some(b'<') {
            return Ok(ParamRef::Named(self.name()?));
        }
        let value = self.real_value()?;
        let id = num_to_int(value, 0, u32::MAX, |v| GCodeError::new(
            ErrorKind::ExpressionArgumentOutOfRange, format!("parameter number {}", v)))?;
        Ok(ParamRef::Numbered(id))
    }

    fn parameter(&mut self) -> GCodeResult<f64> {
        let param = self.parameter_ref()?;
        self.params.read(&param, self.machine)
    }
}

/// Evaluate a real value starting at `*pos` in `text`, advancing the cursor
/// past it.
///
/// The value may be a plain number, a unary `+`/`-`, a function call, a
/// parameter reference, or a bracketed expression.
pub fn evaluate(text: &str, pos: &mut usize, params: &Parameters,
                machine: &Machine) -> GCodeResult<f64> {
    let mut ev = Evaluator { text: text.as_bytes(), pos: *pos, params, machine };
    let value = ev.real_value()?;
    *pos = ev.pos;
    Ok(value)
}

/// Read a parameter reference (for assignment) starting at the `#` at `*pos`.
pub fn read_parameter_ref(text: &str, pos: &mut usize, params: &Parameters,
                          machine: &Machine) -> GCodeResult<ParamRef> {
    let mut ev = Evaluator { text: text.as_bytes(), pos: *pos, params, machine };
    let param = ev.parameter_ref()?;
    *pos = ev.pos;
    Ok(param)
}

/// Evaluate a complete string as one real value.
pub fn evaluate_str(text: &str, params: &Parameters, machine: &Machine) -> GCodeResult<f64> {
    let mut pos = 0;
    let value = evaluate(text, &mut pos, params, machine)?;
    if pos != text.len() {
        return fail(ErrorKind::ExpressionSyntaxError,
                    format!("trailing characters at position {}", pos + 1));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> GCodeResult<f64> {
        evaluate_str(text, &Parameters::new(), &Machine::new())
    }

    fn kind(text: &str) -> ErrorKind {
        eval(text).unwrap_err().kind
    }

    fn assert_close(text: &str, expected: f64) {
        let value = eval(text).unwrap();
        assert!((value - expected).abs() < 1e-9, "{} = {}, expected {}", text, value, expected);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("[1+2*3]"), Ok(7.));
        assert_eq!(eval("[[1+2]*3]"), Ok(9.));
        assert_eq!(eval("[2**3**2]"), Ok(64.));
        assert_eq!(eval("[1+2**2*3]"), Ok(13.));
        assert_eq!(eval("[10-2-3]"), Ok(5.));
        assert_eq!(eval("[1+1EQ2]"), Ok(1.));
        assert_eq!(eval("[1LT2AND3GT2]"), Ok(1.));
        assert_eq!(eval("[[[[1+2]/3]*4]--5]"), Ok(9.));
    }

    #[test]
    fn test_functions() {
        assert_close("SIN[90]", 1.);
        assert_close("COS[180]", -1.);
        assert_close("ATAN[1]/[1]", 45.);
        assert_close("ATAN[1]/[-1]", 135.);
        assert_close("ACOS[0]", 90.);
        assert_close("[SQRT[2]*SQRT[2]]", 2.);
        assert_eq!(eval("ROUND[-2.5]"), Ok(-3.));
        assert_eq!(eval("FIX[-2.5]"), Ok(-3.));
        assert_eq!(eval("FUP[2.1]"), Ok(3.));
        assert_eq!(eval("[-7MOD3]"), Ok(2.));
        assert_eq!(eval("[1EQ1.0005]"), Ok(1.));
        assert_eq!(eval("EXISTS[#<nothing>]"), Ok(0.));
        assert_eq!(eval("EXISTS[#<_x>]"), Ok(1.));
    }

    #[test]
    fn test_errors() {
        assert_eq!(kind("[1/0]"), ErrorKind::ExpressionDivideByZero);
        assert_eq!(kind("[1MOD0]"), ErrorKind::ExpressionDivideByZero);
        assert_eq!(kind("[-8**0.5]"), ErrorKind::ExpressionInvalidArgument);
        assert_eq!(kind("ACOS[2]"), ErrorKind::ExpressionArgumentOutOfRange);
        assert_eq!(kind("LN[0]"), ErrorKind::ExpressionArgumentOutOfRange);
        assert_eq!(kind("SQRT[-1]"), ErrorKind::ExpressionArgumentOutOfRange);
        assert_eq!(kind("EXP[1000]"), ErrorKind::ExpressionInvalidResult);
        assert_eq!(kind("[1+2"), ErrorKind::ExpressionSyntaxError);
        assert_eq!(kind("TEST[1]"), ErrorKind::ExpressionSyntaxError);
        assert_eq!(kind("EXISTS[5]"), ErrorKind::ExpressionInvalidArgument);
        assert_eq!(kind("#1.5"), ErrorKind::ExpressionArgumentOutOfRange);
        assert_eq!(kind("#<undefined>"), ErrorKind::ParameterUndefined);
        assert_eq!(kind("."), ErrorKind::BadNumberFormat);
    }

    #[test]
    fn test_parameters() {
        let m = Machine::new();
        let mut p = Parameters::new();
        p.set(1, 5.).unwrap();
        p.set(5, 2.).unwrap();
        p.set_named("depth", 1.5).unwrap();
        assert_eq!(evaluate_str("[#1*#<depth>]", &p, &m), Ok(7.5));
        assert_eq!(evaluate_str("##5", &p, &m), Ok(0.));
        assert_eq!(evaluate_str("#[#5-1]", &p, &m), Ok(5.));
        assert_eq!(evaluate_str("#<De pth>", &p, &m), Ok(1.5));
    }
}
