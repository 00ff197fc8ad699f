//! purpose: CLI entry point for wirec. Parses command-line arguments using
//!     clap, determines the project root directory, and dispatches to the
//!     build or watch handler.
//!
//! invariants:
//!     - One and only one subcommand is always executed per invocation
//!     - The process exits with 0 on success, 1 on any error
//!
//! gotchas:
//!     - The --root flag can be placed before or after the subcommand due to
//!       global flag
//!     - Verbose mode is also a global flag that affects all commands

use anyhow::Context;
use clap::Parser;
use std::env;
use wirec::cli::{Cli, Commands};
use wirec::commands::{run_build, run_watch};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine root directory
    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir().context("Failed to get current directory")?,
    };

    match cli.command {
        Commands::Build(args) => run_build(&args, &root, cli.verbose),
        Commands::Watch(args) => run_watch(&args, &root, cli.verbose),
    }
}
