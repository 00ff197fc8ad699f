//! purpose: Configuration loading. wirec.toml supplies project-level settings
//!     (source dir, output path, exclusions, watch tuning); the tsconfig file
//!     supplies the compiler-option subset needed for module resolution only
//!     (baseUrl and path aliases) - wirec never type-checks.
//!
//! invariants:
//!     - Config::load returns defaults if wirec.toml doesn't exist
//!     - A malformed wirec.toml or tsconfig warns and falls back to defaults;
//!       configuration problems never abort a build
//!     - CLI flags override file config, which overrides defaults (resolution
//!       happens in the command layer)
//!
//! gotchas:
//!     - tsconfig "paths" keys use the `prefix/*` glob form; only the first
//!       target of each alias is consulted

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "wirec.toml";

/// Main configuration structure matching wirec.toml
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source directory to scan, relative to the project root
    pub src: String,

    /// Output path for the generated container, relative to the project root
    pub out: String,

    /// tsconfig-equivalent file consulted for module resolution
    pub tsconfig: String,

    /// Exclusion patterns (gitignore-style)
    pub exclude: Vec<String>,

    /// Watch-mode tuning
    pub watch: WatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src: "src".to_string(),
            out: "src/container.gen.ts".to_string(),
            tsconfig: "tsconfig.json".to_string(),
            exclude: Vec::new(),
            watch: WatchConfig::default(),
        }
    }
}

/// Watch-mode configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds; bursts of change events inside the
    /// window coalesce into one rebuild
    pub debounce: u64,

    /// Clear the terminal before each rebuild
    pub clear: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: 150,
            clear: false,
        }
    }
}

impl Config {
    /// Load configuration from wirec.toml in the given root directory
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse {}: {}", CONFIG_FILE, e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read {}: {}", CONFIG_FILE, e);
                Self::default()
            }
        }
    }
}

/// The tsconfig subset wirec needs: module-resolution settings only.
#[derive(Debug, Default, Clone)]
pub struct CompilerOptions {
    /// compilerOptions.baseUrl, relative to the project root
    pub base_url: Option<String>,
    /// compilerOptions.paths alias map, e.g. "@app/*" -> ["src/*"]
    pub paths: HashMap<String, Vec<String>>,
}

/// Raw deserialization shape for the tsconfig file
#[derive(Debug, Deserialize)]
struct TsConfigFile {
    #[serde(rename = "compilerOptions", default)]
    compiler_options: TsCompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
struct TsCompilerOptions {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    #[serde(default)]
    paths: HashMap<String, Vec<String>>,
}

impl CompilerOptions {
    /// Load module-resolution options from the configured tsconfig file.
    /// Missing or malformed files yield empty options with a warning; wirec
    /// can still resolve relative imports without them.
    pub fn load(root: &Path, tsconfig: &str) -> Self {
        let path = root.join(tsconfig);
        if !path.exists() {
            return Self::default();
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Warning: Failed to read {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str::<TsConfigFile>(&content) {
            Ok(parsed) => Self {
                base_url: parsed.compiler_options.base_url,
                paths: parsed.compiler_options.paths,
            },
            Err(e) => {
                eprintln!(
                    "Warning: Failed to parse {} (comments are not supported): {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Expand a specifier through the alias map. `"@app/*": ["src/*"]` maps
    /// `@app/db/client` to `src/db/client`. Exact (non-glob) aliases match
    /// whole specifiers only. First matching alias wins.
    pub fn expand_alias(&self, specifier: &str) -> Option<String> {
        // Deterministic alias ordering regardless of map iteration order
        let mut keys: Vec<&String> = self.paths.keys().collect();
        keys.sort();

        for key in keys {
            let targets = &self.paths[key];
            let Some(target) = targets.first() else {
                continue;
            };

            if let Some(prefix) = key.strip_suffix("/*") {
                if let Some(rest) = specifier
                    .strip_prefix(prefix)
                    .and_then(|r| r.strip_prefix('/'))
                {
                    let target_base = target.strip_suffix("/*").unwrap_or(target);
                    return Some(format!("{}/{}", target_base, rest));
                }
            } else if key == specifier {
                return Some(target.clone());
            }
        }
        None
    }
}
