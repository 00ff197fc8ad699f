//! purpose: Lexical import-specifier resolution shared by the scanner and the
//!     watch coordinator. Maps TypeScript import specifiers (relative paths,
//!     tsconfig path aliases, bare package names) to root-relative paths, and
//!     generates the path variants used by the reverse-import search.
//!
//! invariants:
//!     - All returned paths use forward slashes
//!     - Resolution is purely lexical; no filesystem IO, no symlink following
//!
//! gotchas:
//!     - Bare package specifiers are returned as-is; they never match a
//!       tracked source file, which is the intended behavior
//!     - Alias resolution is first-match-wins over the tsconfig "paths" keys

use crate::config::CompilerOptions;
use std::path::{Component, Path, PathBuf};

/// Resolve an import specifier to a root-relative path string.
///
/// Relative specifiers are resolved against the importing file's directory.
/// Specifiers matching a tsconfig `paths` alias are expanded through the
/// alias's first target. Anything else (bare package imports) is returned
/// unchanged.
pub fn resolve_specifier(
    specifier: &str,
    from_file: &Path,
    root: &Path,
    options: &CompilerOptions,
) -> String {
    if specifier.starts_with('.') {
        // Relative import - resolve relative to the importing file.
        // Avoid canonicalize(): it performs filesystem IO and follows symlinks,
        // which is slow and can escape the intended root in surprising ways.
        let from_dir = from_file.parent().unwrap_or(from_file);
        let resolved = normalize_path(&from_dir.join(specifier));
        if let Ok(rel) = resolved.strip_prefix(root) {
            return normalize_separators(&rel.to_string_lossy());
        }
        return normalize_separators(&resolved.to_string_lossy());
    }

    if let Some(expanded) = options.expand_alias(specifier) {
        let base = options.base_url.as_deref().unwrap_or("");
        let joined = normalize_path(&root.join(base).join(&expanded));
        if let Ok(rel) = joined.strip_prefix(root) {
            return normalize_separators(&rel.to_string_lossy());
        }
        return normalize_separators(&expanded);
    }

    // Bare package import - return as-is
    specifier.to_string()
}

/// Simple path normalization (resolve . and ..)
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }
    result
}

/// Normalize path separators to forward slashes for cross-platform consistency
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Path forms a changed file may appear under in another file's imports.
///
/// A file `src/db/client.ts` can be imported as `src/db/client.ts`,
/// `src/db/client`, or with a `./` prefix once resolved, so the reverse
/// lookup has to try each form.
pub fn path_variants(path: &str) -> Vec<String> {
    let normalized = normalize_separators(path);
    let mut variants = vec![normalized.clone()];

    // Without extension (the common TypeScript import style)
    if let Some(without_ext) = normalized
        .strip_suffix(".tsx")
        .or_else(|| normalized.strip_suffix(".ts"))
    {
        variants.push(without_ext.to_string());
        variants.push(format!("./{}", without_ext));

        // index files are importable by their directory
        if let Some(dir) = without_ext
            .strip_suffix("/index")
            .or_else(|| (without_ext == "index").then_some(""))
        {
            if !dir.is_empty() {
                variants.push(dir.to_string());
            }
        }
    }

    variants.push(format!("./{}", normalized));
    variants
}

/// True if any of the changed file's path variants matches one of the
/// recorded (already resolved) import specifiers of another file.
pub fn imports_match(resolved_imports: &[String], changed_variants: &[String]) -> bool {
    resolved_imports
        .iter()
        .any(|imp| changed_variants.iter().any(|v| v == imp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerOptions;
    use std::collections::HashMap;

    fn no_aliases() -> CompilerOptions {
        CompilerOptions::default()
    }

    #[test]
    fn test_resolve_relative_specifier() {
        let root = Path::new("/proj");
        let from = Path::new("/proj/src/services/user.service.ts");
        let resolved = resolve_specifier("./user.repo", from, root, &no_aliases());
        assert_eq!(resolved, "src/services/user.repo");
    }

    #[test]
    fn test_resolve_parent_relative_specifier() {
        let root = Path::new("/proj");
        let from = Path::new("/proj/src/services/user.service.ts");
        let resolved = resolve_specifier("../db/client", from, root, &no_aliases());
        assert_eq!(resolved, "src/db/client");
    }

    #[test]
    fn test_resolve_bare_specifier_passthrough() {
        let root = Path::new("/proj");
        let from = Path::new("/proj/src/main.ts");
        let resolved = resolve_specifier("@pulzar/core", from, root, &no_aliases());
        assert_eq!(resolved, "@pulzar/core");
    }

    #[test]
    fn test_resolve_alias_specifier() {
        let mut paths = HashMap::new();
        paths.insert("@app/*".to_string(), vec!["src/*".to_string()]);
        let options = CompilerOptions {
            base_url: None,
            paths,
        };

        let root = Path::new("/proj");
        let from = Path::new("/proj/src/main.ts");
        let resolved = resolve_specifier("@app/services/auth", from, root, &options);
        assert_eq!(resolved, "src/services/auth");
    }

    #[test]
    fn test_normalize_path() {
        let path = PathBuf::from("/a/b/../c/./d");
        assert_eq!(normalize_path(&path), PathBuf::from("/a/c/d"));
    }

    #[test]
    fn test_normalize_separators() {
        assert_eq!(
            normalize_separators("src\\services\\auth.ts"),
            "src/services/auth.ts"
        );
        assert_eq!(
            normalize_separators("src/services/auth.ts"),
            "src/services/auth.ts"
        );
    }

    #[test]
    fn test_path_variants() {
        let variants = path_variants("src/db/client.ts");
        assert!(variants.contains(&"src/db/client.ts".to_string()));
        assert!(variants.contains(&"src/db/client".to_string()));
        assert!(variants.contains(&"./src/db/client.ts".to_string()));
    }

    #[test]
    fn test_path_variants_index_file() {
        let variants = path_variants("src/db/index.ts");
        assert!(variants.contains(&"src/db".to_string()));
    }

    #[test]
    fn test_imports_match() {
        let imports = vec!["src/db/client".to_string(), "@pulzar/core".to_string()];
        assert!(imports_match(&imports, &path_variants("src/db/client.ts")));
        assert!(!imports_match(&imports, &path_variants("src/other.ts")));
    }
}
