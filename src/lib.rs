// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! A G-Code interpreter and motion emulator for the [Grbl], [grblHAL] and
//! [LinuxCNC] dialects of G-Code.
//!
//! Programs are parsed one block at a time into typed command tokens, with
//! expressions and parameters evaluated and all values converted to
//! millimeters.  The tokens can be rendered back to canonical G-code, saved
//! as XML, or replayed by the emulator, which yields the individual motion
//! segments (with canned cycles expanded) and from which the extents of a
//! program are computed.
//!
//! [Grbl]: https://github.com/gnea/grbl
//! [grblHAL]: https://github.com/grblHAL
//! [LinuxCNC]: http://linuxcnc.org/docs/html/gcode/overview.html
//!
//! ## Basic usage
//!
//! The following code (similar to the "ngc-extents" binary) parses a file
//! and prints the program extents.
//!
//! ```rust,no_run
//! use std::{env, fs};
//! use ngcvm::{ControllerSnapshot, ErrorPolicy, ParserConfig, Program};
//!
//! let filename = env::args().nth(1).unwrap();
//! let input = fs::read_to_string(&filename).unwrap();
//! let program = Program::load(&input, &ControllerSnapshot::default(),
//!                             &ParserConfig::default(), ErrorPolicy::Skip).unwrap();
//! let (extents, _issues) = program.extents();
//! println!("{}", extents);
//! ```
//!
//! For interactive use, drive a `GCodeParser` line by line, and pass its
//! tokens to an `Emulator`.  Both work on a `Machine` that must be reset from
//! a `ControllerSnapshot` first.
//!
//! ## Unsupported features
//!
//! LinuxCNC's control flow constructs ("O codes") and cutter radius
//! compensation paths are not supported.

pub mod axes;
pub mod bbox;
pub mod config;
pub mod emulate;
pub mod error;
pub mod expr;
pub mod geometry;
pub mod machine;
pub mod normalize;
pub mod parse;
pub mod program;
pub mod render;
pub mod token;
pub mod xml;

// internal helpers
pub(crate) mod util;

pub use crate::axes::{Axes, Axis, AxisFlags, Point3};
pub use crate::bbox::BoundingBox;
pub use crate::config::{Dialect, IgnorePolicy, ParserConfig};
pub use crate::emulate::{EmulationIssue, Emulator, RunAction, Shape};
pub use crate::error::{ErrorKind, GCodeError, GCodeResult};
pub use crate::machine::{ControllerSnapshot, Machine, Synchronize};
pub use crate::parse::{GCodeParser, StripPrompt};
pub use crate::program::{ErrorPolicy, Program};
pub use crate::render::Renderer;
pub use crate::token::{Command, Token, TokenData};
