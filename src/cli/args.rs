//! purpose: Command-line interface definition using clap derive macros.
//!     Specifies both commands (build, watch) and their arguments.
//!
//! invariants:
//!     - Global flags (root, verbose) are defined on Cli and propagate to all
//!       subcommands
//!     - CLI flags are optional overrides; unset flags fall back to wirec.toml
//!       and then to built-in defaults (resolution lives in the commands)
//!
//! gotchas:
//!     - The --root flag can be placed before or after the subcommand because
//!       it is global
//!     - --skip-validate is a deliberate escape hatch: the emitted container
//!       may fail at framework runtime with missing or cyclic dependencies

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wirec")]
#[command(author, version, about = "Static DI container compiler for TypeScript")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to project root (defaults to current directory)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the source tree and emit the generated container once
    Build(BuildArgs),

    /// Build, then watch for changes and rebuild incrementally
    Watch(WatchArgs),
}

/// Options shared between build and watch
#[derive(Args, Clone, Default)]
pub struct CommonOptions {
    /// Source directory to scan (overrides wirec.toml; default "src")
    #[arg(long, value_name = "DIR")]
    pub src: Option<String>,

    /// Output path for the generated container (overrides wirec.toml)
    #[arg(long, value_name = "FILE")]
    pub out: Option<String>,

    /// tsconfig-equivalent file consulted for module resolution only
    #[arg(long, value_name = "FILE")]
    pub tsconfig: Option<String>,

    /// Exclude files/directories matching glob pattern (can be repeated)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Don't respect .gitignore files
    #[arg(long)]
    pub no_gitignore: bool,

    /// Emit without validating the provider graph (fast iteration)
    #[arg(long)]
    pub skip_validate: bool,
}

#[derive(Args, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub common: CommonOptions,
}

#[derive(Args, Default)]
pub struct WatchArgs {
    /// Debounce delay in milliseconds (overrides wirec.toml; default 150)
    #[arg(long)]
    pub debounce: Option<u64>,

    /// Clear screen before each rebuild
    #[arg(long)]
    pub clear: bool,

    #[command(flatten)]
    pub common: CommonOptions,
}
