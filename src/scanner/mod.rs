//! purpose: Source scanning front end. Collects candidate TypeScript files
//!     under the configured source directory and statically extracts DI
//!     metadata (providers, modules, import records) from each one via the
//!     tree-sitter extractor.
//!
//! invariants:
//!     - Scanning is a pure read; deterministic for a fixed file set and
//!       content (files sorted, results keyed by root-relative path)
//!     - Best-effort per file: an unreadable or unparseable file is skipped
//!       with a warning and never aborts the batch
//!     - Declaration files (.d.ts) and test files (.test/.spec) are never
//!       scanned
//!
//! flows:
//!     - Collect: walk the source dir (gitignore-aware, exclusions applied)
//!     - Scan: parse each file, extract providers/modules/imports
//!     - Merge: callers key results by root-relative path; re-scanning a file
//!       replaces everything it previously contributed

mod typescript;

use crate::config::CompilerOptions;
use crate::exclusion::{build_walker, ExclusionConfig};
use crate::graph::{ModuleDef, Provider};
use crate::imports::normalize_separators;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use typescript::TypeScriptScanner;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse source: {0}")]
    Parse(String),
}

/// Everything one source file contributes to a build.
#[derive(Debug, Clone, Default)]
pub struct FileScan {
    pub providers: Vec<Provider>,
    pub modules: Vec<ModuleDef>,
    /// Resolved import specifiers (root-relative where resolvable), recorded
    /// for every scanned file and used by the watch coordinator's
    /// reverse-import search
    pub imports: Vec<String>,
}

/// Result of scanning a batch of files.
#[derive(Debug, Default)]
pub struct ScanOutput {
    /// Root-relative path (forward slashes) -> that file's contribution
    pub files: BTreeMap<String, FileScan>,
    /// Non-fatal per-file problems, surfaced to the operator
    pub warnings: Vec<String>,
}

/// True for files the scanner should consider: .ts/.tsx, excluding
/// declaration-only and test-suffixed files.
pub fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if !(name.ends_with(".ts") || name.ends_with(".tsx")) {
        return false;
    }
    !(name.ends_with(".d.ts")
        || name.ends_with(".test.ts")
        || name.ends_with(".spec.ts")
        || name.ends_with(".test.tsx")
        || name.ends_with(".spec.tsx"))
}

/// Static scanner over a project's source tree.
pub struct SourceScanner {
    extractor: TypeScriptScanner,
    options: CompilerOptions,
}

impl SourceScanner {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            extractor: TypeScriptScanner::new(),
            options,
        }
    }

    /// Enumerate scannable files under `src_dir` (relative to `root`),
    /// sorted and deduplicated for deterministic scan order.
    pub fn collect_files(
        &self,
        root: &Path,
        src_dir: &str,
        exclusion: &ExclusionConfig,
    ) -> Vec<PathBuf> {
        let search_path = root.join(src_dir);
        let mut files = Vec::new();

        if search_path.is_file() && is_source_file(&search_path) {
            files.push(search_path);
        } else if search_path.is_dir() {
            let walker = build_walker(&search_path, exclusion);
            for entry in walker.build().filter_map(|e| e.ok()) {
                let entry_path = entry.path();
                if entry_path.is_file() && is_source_file(entry_path) {
                    files.push(entry_path.to_path_buf());
                }
            }
        }

        files.sort();
        files.dedup();
        files
    }

    /// Scan a batch of files, keyed by root-relative path. Files outside the
    /// root or unreadable/unparseable are skipped with a warning.
    pub fn scan_files(&self, root: &Path, files: &[PathBuf]) -> ScanOutput {
        let mut output = ScanOutput::default();

        for path in files {
            let Ok(relative) = path.strip_prefix(root) else {
                output.warnings.push(format!(
                    "{} is outside the project root; skipped",
                    path.display()
                ));
                continue;
            };
            let rel_path = normalize_separators(&relative.to_string_lossy());

            let source = match fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    output
                        .warnings
                        .push(format!("failed to read {}: {}; skipped", rel_path, e));
                    continue;
                }
            };

            match self.scan_source(&source, path, root) {
                Ok(scan) => {
                    output.files.insert(rel_path, scan);
                }
                Err(e) => {
                    output
                        .warnings
                        .push(format!("failed to parse {}: {}; skipped", rel_path, e));
                }
            }
        }

        output
    }

    /// Scan one file's source text. Pure; no IO.
    pub fn scan_source(
        &self,
        source: &str,
        path: &Path,
        root: &Path,
    ) -> Result<FileScan, ScanError> {
        self.extractor.extract(source, path, root, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("src/app.service.ts")));
        assert!(is_source_file(Path::new("src/view.tsx")));
        assert!(!is_source_file(Path::new("src/types.d.ts")));
        assert!(!is_source_file(Path::new("src/app.test.ts")));
        assert!(!is_source_file(Path::new("src/app.spec.ts")));
        assert!(!is_source_file(Path::new("src/view.spec.tsx")));
        assert!(!is_source_file(Path::new("src/app.js")));
        assert!(!is_source_file(Path::new("README.md")));
    }

    #[test]
    fn test_collect_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("services")).unwrap();
        fs::write(src.join("zeta.ts"), "").unwrap();
        fs::write(src.join("alpha.ts"), "").unwrap();
        fs::write(src.join("types.d.ts"), "").unwrap();
        fs::write(src.join("alpha.spec.ts"), "").unwrap();
        fs::write(src.join("services/db.ts"), "").unwrap();

        let scanner = SourceScanner::new(CompilerOptions::default());
        let files = scanner.collect_files(temp.path(), "src", &ExclusionConfig::default());

        let names: Vec<String> = files
            .iter()
            .map(|p| {
                normalize_separators(&p.strip_prefix(temp.path()).unwrap().to_string_lossy())
            })
            .collect();
        assert_eq!(
            names,
            vec!["src/alpha.ts", "src/services/db.ts", "src/zeta.ts"]
        );
    }

    #[test]
    fn test_scan_files_skips_unreadable_with_warning() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("good.ts"), "export class Good {}").unwrap();
        // Invalid UTF-8 forces a read failure in read_to_string
        fs::write(src.join("bad.ts"), [0xff, 0xfe, 0x00, 0x01]).unwrap();

        let scanner = SourceScanner::new(CompilerOptions::default());
        let files = vec![src.join("bad.ts"), src.join("good.ts")];
        let output = scanner.scan_files(temp.path(), &files);

        assert!(output.files.contains_key("src/good.ts"));
        assert!(!output.files.contains_key("src/bad.ts"));
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("src/bad.ts"));
    }

    #[test]
    fn test_scan_files_keys_are_root_relative() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(
            src.join("logger.ts"),
            "@Injectable()\nexport class Logger {}\n",
        )
        .unwrap();

        let scanner = SourceScanner::new(CompilerOptions::default());
        let output = scanner.scan_files(temp.path(), &[src.join("logger.ts")]);

        let scan = output.files.get("src/logger.ts").expect("scanned");
        assert_eq!(scan.providers.len(), 1);
        assert_eq!(scan.providers[0].token, "Logger");
        assert_eq!(scan.providers[0].source_file, "src/logger.ts");
    }
}
