// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Helper for converting a floating number with the given number of decimal
/// figures to an integer (e.g. `59.1` with one figure is `591`), or a suitable
/// error.
pub fn num_to_int<T>(inp: f64, figures: i32, max: u32, err: impl FnOnce(f64) -> T) -> Result<u32, T> {
    let v = inp * 10f64.powi(figures);
    if v.round() >= max as f64 {
        Err(err(inp))
    } else if (v.round() - v).abs() < 0.0001 && v >= 0. {
        Ok(v.round() as u32)
    } else {
        Err(err(inp))
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let f = 10f64.powi(precision as i32);
    let r = (value * f).round() / f;
    // avoid rendering "-0"
    if r == 0. { 0. } else { r }
}

/// Format a number for G-code output: fixed precision, trailing zeros and
/// a trailing decimal point removed.
pub fn format_num(value: f64, precision: u32) -> String {
    let s = format!("{:.*}", precision as usize, round_to(value, precision));
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Equality up to the given number of decimal places.
pub fn same_at(a: f64, b: f64, precision: u32) -> bool {
    round_to(a, precision) == round_to(b, precision)
}
