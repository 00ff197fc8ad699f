//! purpose: Container emission. Serializes a validated CompilationResult into
//!     one generated TypeScript module: imports for class providers, a
//!     token -> factory table, a provider manifest, and a memoizing Container
//!     whose get() instantiates in dependency order with no runtime
//!     reflection.
//!
//! invariants:
//!     - Output is byte-deterministic for a fixed CompilationResult, so
//!       re-running on unchanged input produces an identical artifact
//!     - The content is fully buffered and written in one fs::write; a failed
//!       write leaves the previous artifact authoritative
//!     - An unchanged artifact is not rewritten (keeps downstream watchers of
//!       the generated file quiet)
//!
//! gotchas:
//!     - Factory/value expressions are inlined verbatim from the scanned
//!       source; identifiers they close over must be importable from the
//!       module that declared them or globally available
//!     - On duplicate tokens the first provider in the result's stable order
//!       wins; the build command reports the duplication as a warning

use crate::graph::{CompilationResult, Provider, ProviderKind};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Whether a write actually happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Written,
    Unchanged,
}

/// Render the generated container module as TypeScript source.
///
/// `out_rel` is the root-relative output path; import specifiers for class
/// providers are computed relative to it.
pub fn render_container(result: &CompilationResult, out_rel: &str, validated: bool) -> String {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut providers: Vec<&Provider> = Vec::new();
    for provider in &result.providers {
        if seen.insert(provider.token.as_str()) {
            providers.push(provider);
        }
    }

    let mut out = String::new();
    out.push_str("// Generated by wirec. Do not edit.\n");
    out.push_str(&format!(
        "// Providers: {}. Modules: {}.\n",
        providers.len(),
        result.modules.len()
    ));
    if !validated {
        out.push_str("// WARNING: emitted without graph validation (--skip-validate).\n");
    }
    out.push('\n');

    // Imports for class providers, deduplicated and sorted
    let mut imports: BTreeSet<(String, String)> = BTreeSet::new();
    for provider in &providers {
        if provider.kind == ProviderKind::Class {
            if let Some(class_name) = &provider.class_name {
                imports.insert((
                    relative_import(out_rel, &provider.source_file),
                    class_name.clone(),
                ));
            }
        }
    }
    for (path, name) in &imports {
        out.push_str(&format!("import {{ {} }} from {};\n", name, ts_string(path)));
    }
    if !imports.is_empty() {
        out.push('\n');
    }

    // Provider manifest: token, dependency edges, origin
    out.push_str("export interface ProviderRecord {\n");
    out.push_str("  readonly token: string;\n");
    out.push_str("  readonly deps: readonly string[];\n");
    out.push_str("  readonly source: string;\n");
    out.push_str("}\n\n");

    out.push_str("export const PROVIDERS: readonly ProviderRecord[] = [\n");
    for provider in &providers {
        let deps: Vec<String> = provider.dependencies.iter().map(|d| ts_string(d)).collect();
        out.push_str(&format!(
            "  {{ token: {}, deps: [{}], source: {} }},\n",
            ts_string(&provider.token),
            deps.join(", "),
            ts_string(&provider.source_file)
        ));
    }
    out.push_str("];\n\n");

    // Factory table: construction logic, one closure per token
    out.push_str("type ProviderFactory = (c: Container) => unknown;\n\n");
    out.push_str("const FACTORIES: Record<string, ProviderFactory> = {\n");
    for provider in &providers {
        out.push_str(&format!(
            "  {}: {},\n",
            ts_string(&provider.token),
            factory_expression(provider)
        ));
    }
    out.push_str("};\n\n");

    // Memoizing container: get() walks the (already validated, acyclic)
    // dependency graph, so recursion terminates
    out.push_str("export class Container {\n");
    out.push_str("  private readonly instances = new Map<string, unknown>();\n\n");
    out.push_str("  get<T = unknown>(token: string): T {\n");
    out.push_str("    if (this.instances.has(token)) {\n");
    out.push_str("      return this.instances.get(token) as T;\n");
    out.push_str("    }\n");
    out.push_str("    const factory = FACTORIES[token];\n");
    out.push_str("    if (factory === undefined) {\n");
    out.push_str("      throw new Error(`Unknown provider: ${token}`);\n");
    out.push_str("    }\n");
    out.push_str("    const instance = factory(this);\n");
    out.push_str("    this.instances.set(token, instance);\n");
    out.push_str("    return instance as T;\n");
    out.push_str("  }\n\n");
    out.push_str("  has(token: string): boolean {\n");
    out.push_str("    return Object.prototype.hasOwnProperty.call(FACTORIES, token);\n");
    out.push_str("  }\n");
    out.push_str("}\n\n");
    out.push_str("export function createContainer(): Container {\n");
    out.push_str("  return new Container();\n");
    out.push_str("}\n");

    out
}

/// Write the rendered container, creating the destination directory if
/// absent. Skips the write when the on-disk content already matches.
pub fn write_container(root: &Path, out_rel: &str, content: &str) -> Result<EmitOutcome, EmitError> {
    let out_path = root.join(out_rel);

    if let Ok(existing) = fs::read_to_string(&out_path) {
        if existing == content {
            return Ok(EmitOutcome::Unchanged);
        }
    }

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(|source| EmitError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }

    fs::write(&out_path, content).map_err(|source| EmitError::Write {
        path: out_path.display().to_string(),
        source,
    })?;

    Ok(EmitOutcome::Written)
}

/// Construction closure for one provider
fn factory_expression(provider: &Provider) -> String {
    let gets: Vec<String> = provider
        .dependencies
        .iter()
        .map(|dep| format!("c.get({})", ts_string(dep)))
        .collect();

    match provider.kind {
        ProviderKind::Class => {
            let class_name = provider.class_name.as_deref().unwrap_or(&provider.token);
            if gets.is_empty() {
                format!("() => new {}()", class_name)
            } else {
                format!("(c) => new {}({})", class_name, gets.join(", "))
            }
        }
        ProviderKind::Factory => {
            let expr = provider.expression.as_deref().unwrap_or("() => undefined");
            if gets.is_empty() {
                format!("() => ({})()", expr)
            } else {
                format!("(c) => ({})({})", expr, gets.join(", "))
            }
        }
        ProviderKind::Value => {
            let expr = provider.expression.as_deref().unwrap_or("undefined");
            format!("() => ({})", expr)
        }
    }
}

/// Import specifier for a class provider's source file, relative to the
/// generated output file, extension stripped. Purely lexical.
fn relative_import(out_rel: &str, source_rel: &str) -> String {
    let out_parts: Vec<&str> = out_rel.split('/').collect();
    let out_dir = &out_parts[..out_parts.len().saturating_sub(1)];
    let source_parts: Vec<&str> = source_rel.split('/').collect();

    let common = out_dir
        .iter()
        .zip(source_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..out_dir.len() {
        parts.push("..".to_string());
    }
    if parts.is_empty() {
        parts.push(".".to_string());
    }
    for part in &source_parts[common..] {
        parts.push((*part).to_string());
    }

    let mut joined = parts.join("/");
    for ext in [".tsx", ".ts"] {
        if let Some(stripped) = joined.strip_suffix(ext) {
            joined = stripped.to_string();
            break;
        }
    }
    joined
}

/// A TypeScript string literal (serde_json escaping is valid TS)
fn ts_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}
