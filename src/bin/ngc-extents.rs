// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Emulates a G-code file and prints its extents.

use std::path::PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ngcvm::{BoundingBox, ControllerSnapshot, Dialect, ErrorPolicy, Machine, ParserConfig, Program};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input G-code file
    input: PathBuf,

    /// Parser configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller snapshot to start from (TOML)
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Override the dialect of the configuration
    #[arg(short, long)]
    dialect: Option<Dialect>,

    /// List every motion segment
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ParserConfig::load(path)?,
        None => ParserConfig::default(),
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }
    let snapshot = match &cli.snapshot {
        Some(path) => ControllerSnapshot::load(path)?,
        None => ControllerSnapshot::default(),
    };

    let text = std::fs::read_to_string(&cli.input)?;
    let program = Program::load(&text, &snapshot, &config, ErrorPolicy::Skip)?;
    for e in program.errors() {
        eprintln!("line {}: {}", e.line, e.message(config.dialect));
    }

    let mut machine = Machine::new();
    let mut extents = BoundingBox::new();
    let mut emulator = program.emulate(&mut machine);
    let mut count = 0;
    for action in &mut emulator {
        if cli.verbose {
            println!("{:>5} {:<6} ({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3}){}{}",
                     action.token.line, action.token.command.to_string(),
                     action.start.x, action.start.y, action.start.z,
                     action.end.x, action.end.y, action.end.z,
                     if action.is_rapid { " rapid" } else { "" },
                     if action.is_retract { " retract" } else { "" });
        }
        extents.add_action(&action);
        count += 1;
    }
    extents.conclude();
    for issue in emulator.issues() {
        eprintln!("{}", issue);
    }
    println!("{} motion segments", count);
    println!("{}", extents);
    Ok(())
}
