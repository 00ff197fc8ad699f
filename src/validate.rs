//! purpose: Graph validation for a CompilationResult. Checks completeness
//!     (every dependency token has a provider) and acyclicity (no dependency
//!     cycles), collecting every violation before failing so one build attempt
//!     reports all simultaneous mistakes.
//!
//! invariants:
//!     - Never fail-fast: all missing dependencies and all cycles are gathered
//!       in one pass
//!     - Cycle detection is an iterative three-color DFS with an explicit
//!       stack; no recursion, no stack-depth limit
//!     - Traversal order is deterministic (tokens visited in sorted order), so
//!       reported violations are stable across runs
//!
//! gotchas:
//!     - Edges to missing tokens are already reported by the completeness
//!       check; the DFS skips them instead of reporting twice
//!     - With duplicate tokens the first provider in the (sorted) result wins
//!       for traversal, matching what emission does

use crate::graph::CompilationResult;
use std::collections::BTreeMap;
use thiserror::Error;

/// A declared dependency token with no matching provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider '{provider}' depends on '{token}', which is not registered")]
pub struct MissingDependency {
    pub provider: String,
    pub token: String,
}

/// A dependency cycle. The path starts and ends at the same token and lists
/// every intermediate token in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circular dependency: {}", path.join(" -> "))]
pub struct CircularDependency {
    pub path: Vec<String>,
}

/// Aggregate validation failure. Blocks emission.
#[derive(Debug, Error)]
#[error("{}", self.render())]
pub struct ValidationFailure {
    pub missing: Vec<MissingDependency>,
    pub cycles: Vec<CircularDependency>,
}

impl ValidationFailure {
    fn render(&self) -> String {
        let mut lines = Vec::new();
        if !self.missing.is_empty() {
            lines.push(format!("{} missing dependency(ies):", self.missing.len()));
            for m in &self.missing {
                lines.push(format!("  - {}", m));
            }
        }
        if !self.cycles.is_empty() {
            lines.push(format!("{} circular dependency(ies):", self.cycles.len()));
            for c in &self.cycles {
                lines.push(format!("  - {}", c));
            }
        }
        lines.join("\n")
    }
}

/// Per-node DFS state for the three-color scheme.
#[derive(Clone, Copy, PartialEq)]
enum Color {
    /// Not yet visited
    White,
    /// On the current traversal path
    Gray,
    /// Fully resolved; cannot be part of an undiscovered cycle
    Black,
}

/// Validate a CompilationResult, collecting every violation of completeness
/// and acyclicity before failing.
pub fn validate(result: &CompilationResult) -> Result<(), ValidationFailure> {
    // Token -> dependency list. BTreeMap keeps traversal order stable; on
    // duplicate tokens the first provider in the sorted result wins.
    let mut deps: BTreeMap<&str, &[String]> = BTreeMap::new();
    for provider in &result.providers {
        deps.entry(provider.token.as_str())
            .or_insert(provider.dependencies.as_slice());
    }

    // Completeness: every referenced token must exist as a provider
    let mut missing = Vec::new();
    for provider in &result.providers {
        for dep in &provider.dependencies {
            if !deps.contains_key(dep.as_str()) {
                missing.push(MissingDependency {
                    provider: provider.token.clone(),
                    token: dep.clone(),
                });
            }
        }
    }

    // Acyclicity: three-color DFS over every node, continuing past the first
    // cycle so disjoint cycles are all reported in one pass
    let mut colors: BTreeMap<&str, Color> = deps.keys().map(|t| (*t, Color::White)).collect();
    let mut cycles = Vec::new();

    for &start in deps.keys() {
        if colors[start] != Color::White {
            continue;
        }

        // Explicit stack of (token, next dependency index); `path` mirrors
        // the gray chain so a back edge can be reported as a full cycle.
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        let mut path: Vec<&str> = vec![start];
        colors.insert(start, Color::Gray);

        while let Some((node, idx)) = stack.last_mut() {
            let node_deps = deps[*node];
            if *idx < node_deps.len() {
                let dep = node_deps[*idx].as_str();
                *idx += 1;

                match colors.get(dep) {
                    // Missing token: already reported by the completeness check
                    None => continue,
                    Some(Color::Gray) => {
                        // Back edge closes a cycle: report from the first
                        // occurrence of `dep` on the path back to itself
                        let pos = path.iter().position(|t| *t == dep).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[pos..].iter().map(|t| t.to_string()).collect();
                        cycle.push(dep.to_string());
                        cycles.push(CircularDependency { path: cycle });
                    }
                    Some(Color::Black) => continue,
                    Some(Color::White) => {
                        colors.insert(dep, Color::Gray);
                        stack.push((dep, 0));
                        path.push(dep);
                    }
                }
            } else {
                colors.insert(*node, Color::Black);
                stack.pop();
                path.pop();
            }
        }
    }

    if missing.is_empty() && cycles.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { missing, cycles })
    }
}
