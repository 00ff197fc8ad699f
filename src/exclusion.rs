//! purpose: File exclusion for source-tree walking, combining gitignore
//!     handling with default directory exclusions and patterns from
//!     wirec.toml / CLI --exclude flags.
//!
//! invariants:
//!     - Default exclusions (node_modules, .git, dist, ...) are always applied
//!     - CLI --exclude patterns are combined with wirec.toml exclude patterns
//!     - Gitignore is respected by default unless --no-gitignore is passed
//!
//! gotchas:
//!     - The ignore crate's override patterns are inclusive by default, so
//!       exclusions get a ! prefix

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::Path;

/// Configuration for file exclusion during directory walking
pub struct ExclusionConfig {
    /// Glob patterns to exclude (from wirec.toml and --exclude flags)
    pub patterns: Vec<String>,
    /// Whether to respect .gitignore files (default: true)
    pub respect_gitignore: bool,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            respect_gitignore: true,
        }
    }
}

/// Directories that never contain scannable application source
const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "coverage",
    ".wirec",
    ".next",
    ".nuxt",
];

/// Build a WalkBuilder with the given exclusion configuration
pub fn build_walker(root: &Path, config: &ExclusionConfig) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);

    builder.git_ignore(config.respect_gitignore);
    builder.git_global(config.respect_gitignore);
    builder.git_exclude(config.respect_gitignore);

    // Don't apply the hidden-files filter (.git is excluded explicitly)
    builder.hidden(false);

    let mut overrides = OverrideBuilder::new(root);

    for dir in DEFAULT_EXCLUDED_DIRS {
        let pattern = format!("!{}/**", dir);
        let _ = overrides.add(&pattern);
        let pattern = format!("!{}", dir);
        let _ = overrides.add(&pattern);
    }

    // User patterns become exclusions via the ! prefix
    for pattern in &config.patterns {
        let exclude_pattern = format!("!{}", pattern);
        if let Err(e) = overrides.add(&exclude_pattern) {
            eprintln!("Warning: invalid exclude pattern '{}': {}", pattern, e);
        }
    }

    if let Ok(built) = overrides.build() {
        builder.overrides(built);
    }

    builder
}

/// Build a GlobSet from patterns for filtering individual event paths
pub fn build_exclude_globset(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                eprintln!("Warning: invalid exclude pattern '{}': {}", pattern, e);
            }
        }
    }

    builder.build().ok()
}

/// Check if a directory name should be excluded by default
pub fn is_default_excluded_dir(name: &str) -> bool {
    DEFAULT_EXCLUDED_DIRS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_excluded_dirs() {
        assert!(is_default_excluded_dir("node_modules"));
        assert!(is_default_excluded_dir(".git"));
        assert!(is_default_excluded_dir("dist"));
        assert!(is_default_excluded_dir(".wirec"));
        assert!(!is_default_excluded_dir("src"));
        assert!(!is_default_excluded_dir("lib"));
    }

    #[test]
    fn test_exclusion_config_default() {
        let config = ExclusionConfig::default();
        assert!(config.patterns.is_empty());
        assert!(config.respect_gitignore);
    }

    #[test]
    fn test_walker_skips_node_modules() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("node_modules")).unwrap();
        fs::write(temp_dir.path().join("node_modules/dep.ts"), "x").unwrap();
        fs::write(temp_dir.path().join("main.ts"), "x").unwrap();

        let walker = build_walker(temp_dir.path(), &ExclusionConfig::default());
        let files: Vec<_> = walker
            .build()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.path().to_path_buf())
            .collect();

        assert_eq!(files.len(), 1);
        assert!(files[0].to_string_lossy().contains("main.ts"));
    }

    #[test]
    fn test_walker_applies_user_patterns() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("main.ts"), "x").unwrap();
        fs::create_dir(temp_dir.path().join("fixtures")).unwrap();
        fs::write(temp_dir.path().join("fixtures/sample.ts"), "x").unwrap();

        let config = ExclusionConfig {
            patterns: vec!["fixtures/**".to_string()],
            respect_gitignore: true,
        };

        let walker = build_walker(temp_dir.path(), &config);
        let ts_files: Vec<_> = walker
            .build()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| e.path().extension().map(|x| x == "ts").unwrap_or(false))
            .collect();

        assert_eq!(ts_files.len(), 1);
        assert!(ts_files[0].path().to_string_lossy().contains("main.ts"));
    }

    #[test]
    fn test_gitignore_respected() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();
        fs::write(temp_dir.path().join(".gitignore"), "generated/\n").unwrap();
        fs::create_dir(temp_dir.path().join("generated")).unwrap();
        fs::write(temp_dir.path().join("generated/out.ts"), "x").unwrap();
        fs::write(temp_dir.path().join("main.ts"), "x").unwrap();

        let walker = build_walker(temp_dir.path(), &ExclusionConfig::default());
        let ts_files: Vec<_> = walker
            .build()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| e.path().extension().map(|x| x == "ts").unwrap_or(false))
            .collect();

        assert_eq!(ts_files.len(), 1);
        assert!(ts_files[0].path().to_string_lossy().contains("main.ts"));
    }

    #[test]
    fn test_gitignore_not_respected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".gitignore"), "generated/\n").unwrap();
        fs::create_dir(temp_dir.path().join("generated")).unwrap();
        fs::write(temp_dir.path().join("generated/out.ts"), "x").unwrap();
        fs::write(temp_dir.path().join("main.ts"), "x").unwrap();

        let config = ExclusionConfig {
            patterns: vec![],
            respect_gitignore: false,
        };

        let walker = build_walker(temp_dir.path(), &config);
        let ts_files: Vec<_> = walker
            .build()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| e.path().extension().map(|x| x == "ts").unwrap_or(false))
            .collect();

        assert_eq!(ts_files.len(), 2);
    }

    #[test]
    fn test_build_exclude_globset() {
        assert!(build_exclude_globset(&[]).is_none());

        let patterns = vec!["*.spec.ts".to_string(), "fixtures/**".to_string()];
        let globset = build_exclude_globset(&patterns).unwrap();
        assert!(globset.is_match("auth.spec.ts"));
        assert!(globset.is_match("fixtures/sample.ts"));
        assert!(!globset.is_match("main.ts"));
    }
}
