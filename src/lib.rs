//! purpose: Library crate root for wirec, exposing the public API for use as
//!     both a CLI tool and a library. Re-exports the types consumers need to
//!     drive a build programmatically.
//!
//! invariants:
//!     - The public API surface is stable - all re-exported items are public
//!       contract
//!
//! gotchas:
//!     - The lib.rs is separate from main.rs - library consumers get lib, CLI
//!       gets main

pub mod cli;
pub mod commands;
pub mod config;
pub mod emit;
pub mod exclusion;
pub mod fingerprint;
pub mod graph;
pub mod imports;
pub mod scanner;
pub mod validate;

// Re-export main types for convenience
pub use cli::{BuildArgs, Cli, Commands, CommonOptions, WatchArgs};
pub use commands::{run_build, run_watch, BuildSettings, RebuildOutcome, WatchCoordinator};
pub use config::{CompilerOptions, Config};
pub use emit::{render_container, write_container, EmitOutcome};
pub use graph::{build_result, CompilationResult, ModuleDef, Provider, ProviderKind};
pub use scanner::{FileScan, ScanError, ScanOutput, SourceScanner};
pub use validate::{validate, CircularDependency, MissingDependency, ValidationFailure};
