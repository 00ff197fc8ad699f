//! purpose: Core data model for the provider graph. Defines Provider, ModuleDef
//!     and CompilationResult, plus the pure build step that reshapes per-file
//!     scan output into one whole-project result with stable ordering.
//!
//! invariants:
//!     - build_result is pure data reshaping; it never fails and performs no IO
//!     - Output ordering is deterministic: providers by (token, source_file),
//!       modules by name
//!     - Re-scanning a file replaces everything it previously contributed (the
//!       per-file map handed to build_result is the unit of replacement)
//!
//! gotchas:
//!     - Duplicate tokens are allowed through and surfaced as warnings; the
//!       validator only enforces completeness and acyclicity

use crate::scanner::FileScan;
use std::collections::BTreeMap;

/// How a provider is constructed at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// An `@Injectable()` class, constructed with `new`
    Class,
    /// A `{ provide, useFactory, inject }` entry; called with its deps
    Factory,
    /// A `{ provide, useValue }` entry; the expression is used as-is
    Value,
}

/// One injectable unit in the graph, keyed by token.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Unique identifier; the graph node key
    pub token: String,
    /// Tokens this provider requires at construction, in declaration order
    pub dependencies: Vec<String>,
    /// Root-relative origin path (forward slashes), for diagnostics and
    /// incremental invalidation
    pub source_file: String,
    pub kind: ProviderKind,
    /// Exported class name to import in the generated container (Class only)
    pub class_name: Option<String>,
    /// Captured initializer text (Factory and Value only)
    pub expression: Option<String>,
}

/// A named grouping of providers mirroring the framework's `@Module` concept.
#[derive(Debug, Clone)]
pub struct ModuleDef {
    pub name: String,
    /// Tokens this module registers
    pub providers: Vec<String>,
    /// Names of imported modules
    pub imports: Vec<String>,
    /// Subset of `providers` visible to importing modules
    pub exports: Vec<String>,
    pub source_file: String,
}

/// Output of one full build. Created fresh per invocation, immutable once
/// returned; consumed by validation and emission and then discarded.
#[derive(Debug, Clone, Default)]
pub struct CompilationResult {
    pub providers: Vec<Provider>,
    pub modules: Vec<ModuleDef>,
}

impl CompilationResult {
    /// Tokens that appear more than once. The build step lets these through;
    /// callers report them as warnings and emission uses the first occurrence.
    pub fn duplicate_tokens(&self) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for provider in &self.providers {
            *counts.entry(provider.token.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(token, _)| token.to_string())
            .collect()
    }
}

/// Assemble the per-file scan map into a CompilationResult.
///
/// The map is keyed by root-relative path, so iteration is already ordered by
/// file; providers and modules are re-sorted globally to keep the result (and
/// everything derived from it, including the emitted artifact) byte-stable
/// across runs regardless of scan order.
pub fn build_result(files: &BTreeMap<String, FileScan>) -> CompilationResult {
    let mut providers: Vec<Provider> = Vec::new();
    let mut modules: Vec<ModuleDef> = Vec::new();

    for scan in files.values() {
        providers.extend(scan.providers.iter().cloned());
        modules.extend(scan.modules.iter().cloned());
    }

    providers.sort_by(|a, b| {
        (a.token.as_str(), a.source_file.as_str()).cmp(&(b.token.as_str(), b.source_file.as_str()))
    });
    modules.sort_by(|a, b| a.name.cmp(&b.name));

    CompilationResult { providers, modules }
}
