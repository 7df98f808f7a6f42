// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Parser configuration: the target dialect and the ignore/strip policies.

use std::path::Path;
use serde::Deserialize;
use strum_macros::{Display, EnumString};
use thiserror::Error;

/// The controller dialect whose G-code subset is accepted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumString, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Dialect {
    Grbl,
    #[strum(serialize = "grblhal")]
    GrblHal,
    #[strum(serialize = "linuxcnc")]
    LinuxCnc,
}

impl Default for Dialect {
    fn default() -> Self { Dialect::GrblHal }
}

/// What to do with a code the user may want to keep away from the machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnorePolicy {
    /// Process normally.
    No,
    /// Ask the `StripPrompt` whether to strip the code.
    Prompt,
    /// Remove the code from the block, record no token.
    Strip,
}

impl Default for IgnorePolicy {
    fn default() -> Self { IgnorePolicy::No }
}

/// Configuration for a `GCodeParser`, given at construction.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub dialect: Dialect,
    /// Policy for M6 (tool change).
    pub ignore_m6: IgnorePolicy,
    /// Policy for M7 (mist coolant).
    pub ignore_m7: IgnorePolicy,
    /// Policy for M8 (flood coolant).
    pub ignore_m8: IgnorePolicy,
    /// Policy for G61/G61.1/G64 (path control mode).
    pub ignore_g61_g64: IgnorePolicy,
    /// Skip blocks starting with `/`.
    pub block_delete: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ParserConfig {
    pub fn new(dialect: Dialect) -> Self {
        ParserConfig { dialect, ..Default::default() }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded parser configuration from {}", path.as_ref().display());
        Ok(config)
    }
}
