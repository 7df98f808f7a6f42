// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Parses a G-code file and prints it in canonical form (or as XML).

use std::path::PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ngcvm::{ControllerSnapshot, Dialect, ErrorPolicy, ParserConfig, Program};

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

    /// Omit repeated axis words in G0/G1
    #[arg(long)]
    compress: bool,

    /// Print the token list as XML
    #[arg(long)]
    xml: bool,

    /// Stop at the first invalid block
    #[arg(long)]
    abort: bool,
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
    let policy = if cli.abort { ErrorPolicy::Abort } else { ErrorPolicy::Skip };

    let text = std::fs::read_to_string(&cli.input)?;
    let program = match Program::load(&text, &snapshot, &config, policy) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("line {}: {}", e.line, e.message(config.dialect));
            std::process::exit(1);
        }
    };
    for e in program.errors() {
        eprintln!("line {}: {}", e.line, e.message(config.dialect));
    }
    if cli.xml {
        println!("{}", program.to_xml()?);
    } else {
        print!("{}", program.render(cli.compress));
    }
    Ok(())
}
