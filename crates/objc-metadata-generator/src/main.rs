// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::*;
use colored::Colorize;
use log::debug;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

mod generate;

#[derive(Parser)]
#[clap(
    name = env!("CARGO_BIN_NAME"),
    about = "Reduces a C/Objective-C header-declaration graph dump to a compact binary \
             metadata artifact: resolves forward references, filters unrepresentable \
             declarations, deduplicates the inheritance lattice and serializes the result \
             as an offset-addressed blob",
    rename_all = "kebab-case",
    author,
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Args {
    /// Path to the declaration-graph dump produced by the front end
    #[clap(long = "input", short = 'i')]
    pub input: PathBuf,

    /// Path of the binary metadata file to write
    #[clap(long = "output", short = 'o')]
    pub output: PathBuf,

    /// Pointer width of the target architecture, in bytes
    #[clap(long = "pointer-width", default_value_t = 4)]
    pub pointer_width: usize,

    /// TOML denylist applied on top of the built-in table
    #[clap(long = "denylist")]
    pub denylist: Option<PathBuf>,

    /// Log pass-by-pass detail
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,
}

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).unwrap();

    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger initialization");

    debug!(
        "{} version: {}",
        env!("CARGO_BIN_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    match generate::execute(&args) {
        Ok(_) => (),
        Err(err) => {
            let err = format!("{:?}", err);
            println!("{}", err.bold().red());
            std::process::exit(1);
        }
    }
}
