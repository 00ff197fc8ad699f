//! purpose: Implements the build command: one full scan -> graph -> validate
//!     -> emit cycle. Also hosts the settings resolution shared with watch
//!     mode.
//!
//! invariants:
//!     - Validation failure blocks emission; the previous artifact, if any, is
//!       left untouched
//!     - The generated output file is never scanned as input, even though it
//!       lives under the source directory by default
//!
//! flows:
//!     - Resolve: CLI flags over wirec.toml over defaults
//!     - Scan: collect files, extract metadata (warnings are non-fatal)
//!     - Emit: render once in memory, single write, skip when unchanged

use crate::cli::{BuildArgs, CommonOptions};
use crate::config::{CompilerOptions, Config};
use crate::emit::{render_container, write_container, EmitOutcome};
use crate::exclusion::ExclusionConfig;
use crate::graph::{build_result, CompilationResult};
use crate::scanner::SourceScanner;
use crate::validate::validate;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Effective build settings after CLI flags, wirec.toml and defaults are
/// merged (in that precedence order).
pub struct BuildSettings {
    pub src: String,
    pub out: String,
    pub tsconfig: String,
    pub exclusion: ExclusionConfig,
    pub skip_validate: bool,
}

impl BuildSettings {
    pub fn resolve(common: &CommonOptions, config: &Config) -> Self {
        let mut patterns = config.exclude.clone();
        patterns.extend(common.exclude.clone());

        Self {
            src: common.src.clone().unwrap_or_else(|| config.src.clone()),
            out: common.out.clone().unwrap_or_else(|| config.out.clone()),
            tsconfig: common
                .tsconfig
                .clone()
                .unwrap_or_else(|| config.tsconfig.clone()),
            exclusion: ExclusionConfig {
                patterns,
                respect_gitignore: !common.no_gitignore,
            },
            skip_validate: common.skip_validate,
        }
    }

    /// Absolute path of the generated artifact
    pub fn out_path(&self, root: &Path) -> PathBuf {
        root.join(&self.out)
    }
}

pub fn run_build(args: &BuildArgs, root: &Path, verbose: bool) -> Result<()> {
    let config = Config::load(root);
    let settings = BuildSettings::resolve(&args.common, &config);
    let options = CompilerOptions::load(root, &settings.tsconfig);
    let scanner = SourceScanner::new(options);

    let mut files = scanner.collect_files(root, &settings.src, &settings.exclusion);
    // The generated container is itself a .ts file under the source dir;
    // it must never feed back into the scan
    let out_path = settings.out_path(root);
    files.retain(|p| *p != out_path);

    if verbose {
        println!("Scanning {} source files...", files.len());
    }

    let output = scanner.scan_files(root, &files);
    for warning in &output.warnings {
        eprintln!("Warning: {}", warning);
    }

    let result = build_result(&output.files);
    report_duplicates(&result);

    if verbose {
        println!(
            "Found {} providers in {} modules",
            result.providers.len(),
            result.modules.len()
        );
    }

    let validated = !settings.skip_validate;
    if validated {
        validate(&result).context("provider graph validation failed")?;
    }

    let content = render_container(&result, &settings.out, validated);
    let outcome = write_container(root, &settings.out, &content)
        .context("failed to emit generated container")?;

    match outcome {
        EmitOutcome::Written => println!(
            "Generated {} ({} providers, {} modules)",
            settings.out,
            result.providers.len(),
            result.modules.len()
        ),
        EmitOutcome::Unchanged => println!("{} is up to date", settings.out),
    }

    Ok(())
}

/// Surface duplicate token registrations; shared by build and watch.
pub(crate) fn report_duplicates(result: &CompilationResult) {
    for token in result.duplicate_tokens() {
        eprintln!(
            "Warning: provider token '{}' is registered more than once; the first registration wins",
            token
        );
    }
}
