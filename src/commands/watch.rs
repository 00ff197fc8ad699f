//! purpose: Implements the watch command: an initial full build followed by
//!     incremental rebuilds driven by filesystem notifications. The
//!     WatchCoordinator owns the scan cache, the per-file content
//!     fingerprints, and the pending-change queue.
//!
//! when-editing:
//!     - !The scan cache must be kept in sync with file system state
//!     - !Debouncing is critical for handling rapid file changes (IDE saves)
//!     - Uses notify crate for cross-platform file system watching
//!
//! invariants:
//!     - The initial full build completes before watching starts
//!     - A rebuild that fails validation or cannot write the artifact reports
//!       the errors, keeps the previous generated container on disk, and
//!       keeps the watch alive
//!     - Events whose content hash is unchanged never trigger a rebuild
//!     - Config file changes (wirec.toml, tsconfig) trigger a full restart of
//!       the watch session
//!
//! flows:
//!     - Initial: full scan, seed fingerprints, validate, emit
//!     - Watch: receive notify events, coalesce per path, debounce
//!     - Rebuild: hash-filter, expand to reverse importers, rescan affected,
//!       merge into the cache, validate, emit

use crate::cli::WatchArgs;
use crate::commands::{report_duplicates, BuildSettings};
use crate::config::{CompilerOptions, Config, CONFIG_FILE};
use crate::emit::{render_container, write_container, EmitError, EmitOutcome};
use crate::exclusion::{build_exclude_globset, is_default_excluded_dir};
use crate::fingerprint::{FileChange, FingerprintCache};
use crate::graph::build_result;
use crate::imports::{imports_match, normalize_separators, path_variants};
use crate::scanner::{is_source_file, FileScan, SourceScanner};
use crate::validate::{validate, ValidationFailure};
use anyhow::Result;
use globset::GlobSet;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// The kind of change detected for a file
#[derive(Clone, Copy, PartialEq, Debug)]
enum ChangeKind {
    Create,
    Modify,
    Delete,
}

/// What one debounced rebuild pass concluded.
#[derive(Debug)]
pub enum RebuildOutcome {
    /// Every pending event was filtered out (unchanged content hashes)
    NoEffectiveChanges,
    /// The graph validated (or validation was skipped) and the container was
    /// rendered; `outcome` says whether the bytes actually changed
    Emitted {
        affected: usize,
        outcome: EmitOutcome,
    },
    /// The rebuilt graph failed validation; the previous artifact stands
    ValidationFailed {
        affected: usize,
        failure: ValidationFailure,
    },
    /// The container could not be written; the attempt is abandoned and the
    /// previous artifact stands
    EmitFailed {
        affected: usize,
        error: EmitError,
    },
}

/// Owns all mutable watch-mode state: the last successful scan of every file,
/// content fingerprints, and the queue of not-yet-processed change events.
pub struct WatchCoordinator {
    root: PathBuf,
    settings: BuildSettings,
    scanner: SourceScanner,
    fingerprints: FingerprintCache,
    /// Root-relative path -> that file's last known contribution
    scans: BTreeMap<String, FileScan>,
    pending: HashMap<PathBuf, ChangeKind>,
    /// User exclude patterns, applied to individual event paths (the walker
    /// handles them for full scans)
    exclude: Option<GlobSet>,
    config_dirty: bool,
    verbose: bool,
}

impl WatchCoordinator {
    pub fn new(root: &Path, settings: BuildSettings, options: CompilerOptions, verbose: bool) -> Self {
        let exclude = build_exclude_globset(&settings.exclusion.patterns);
        Self {
            root: root.to_path_buf(),
            settings,
            scanner: SourceScanner::new(options),
            fingerprints: FingerprintCache::new(),
            scans: BTreeMap::new(),
            pending: HashMap::new(),
            exclude,
            config_dirty: false,
            verbose,
        }
    }

    /// Full scan and emit. Validation and emission failures are reported but
    /// never abort the watch session; the previous artifact stays in place.
    pub fn initial_build(&mut self) {
        let mut files =
            self.scanner
                .collect_files(&self.root, &self.settings.src, &self.settings.exclusion);
        let out_path = self.settings.out_path(&self.root);
        files.retain(|p| *p != out_path);

        self.fingerprints.seed(&files);

        let output = self.scanner.scan_files(&self.root, &files);
        for warning in &output.warnings {
            eprintln!("Warning: {}", warning);
        }
        self.scans = output.files;

        let result = build_result(&self.scans);
        report_duplicates(&result);

        if !self.settings.skip_validate {
            if let Err(failure) = validate(&result) {
                eprintln!("{}", failure);
                eprintln!("Keeping previous container (if any); watching for fixes...");
                return;
            }
        }

        let content = render_container(&result, &self.settings.out, !self.settings.skip_validate);
        match write_container(&self.root, &self.settings.out, &content) {
            Ok(EmitOutcome::Written) => println!(
                "Generated {} ({} providers)",
                self.settings.out,
                result.providers.len()
            ),
            Ok(EmitOutcome::Unchanged) => println!("{} is up to date", self.settings.out),
            Err(e) => {
                eprintln!("Error: failed to emit generated container: {}", e);
                eprintln!("Keeping previous container (if any); watching for fixes...");
            }
        }
    }

    /// Record a notify event into the pending queue. Config file events flip
    /// `config_dirty` instead; irrelevant paths are dropped.
    pub fn note_event(&mut self, event: &Event) {
        let kind = match &event.kind {
            EventKind::Create(_) => ChangeKind::Create,
            EventKind::Modify(_) => ChangeKind::Modify,
            EventKind::Remove(_) => ChangeKind::Delete,
            _ => return, // Ignore other events
        };

        let out_path = self.settings.out_path(&self.root);
        let config_path = self.root.join(CONFIG_FILE);
        let tsconfig_path = self.root.join(&self.settings.tsconfig);

        for path in &event.paths {
            if *path == config_path || *path == tsconfig_path {
                self.config_dirty = true;
                continue;
            }

            // The generated container is a .ts file under the watched tree;
            // reacting to our own writes would loop forever
            if *path == out_path {
                continue;
            }
            // A remove of an extensionless path is a deleted directory; the
            // path is already gone so it cannot be stat'ed. Expand it into
            // deletes for every tracked file underneath it.
            if kind == ChangeKind::Delete && path.extension().is_none() {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    let prefix = format!("{}/", normalize_separators(&relative.to_string_lossy()));
                    let tracked: Vec<PathBuf> = self
                        .scans
                        .keys()
                        .filter(|rel| rel.starts_with(&prefix))
                        .map(|rel| self.root.join(rel))
                        .collect();
                    for file in tracked {
                        self.pending.insert(file, ChangeKind::Delete);
                    }
                }
                continue;
            }
            if !is_source_file(path) {
                continue;
            }
            if path
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .any(is_default_excluded_dir)
            {
                continue;
            }
            if let Some(globset) = &self.exclude {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    if globset.is_match(relative) {
                        continue;
                    }
                }
            }

            // Coalesce events: Create + Modify = Create, Modify + Delete = Delete
            self.pending
                .entry(path.clone())
                .and_modify(|existing| {
                    *existing = match (*existing, kind) {
                        (ChangeKind::Create, ChangeKind::Modify) => ChangeKind::Create,
                        (ChangeKind::Create, ChangeKind::Delete) => ChangeKind::Delete,
                        (ChangeKind::Modify, ChangeKind::Delete) => ChangeKind::Delete,
                        (_, new) => new,
                    };
                })
                .or_insert(kind);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take_config_dirty(&mut self) -> bool {
        std::mem::take(&mut self.config_dirty)
    }

    /// Drain the pending queue and run one incremental rebuild. Every
    /// failure mode is an outcome, not an error; the watch session survives
    /// all of them.
    pub fn rebuild_pending(&mut self) -> RebuildOutcome {
        let changes: Vec<(PathBuf, ChangeKind)> = self.pending.drain().collect();

        // Hash-filter: only events that actually changed content count
        let mut effective: Vec<String> = Vec::new();
        for (path, kind) in changes {
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let rel_path = normalize_separators(&relative.to_string_lossy());

            match kind {
                ChangeKind::Delete => {
                    let was_tracked = self.fingerprints.remove(&path);
                    let had_scan = self.scans.remove(&rel_path).is_some();
                    if was_tracked || had_scan {
                        effective.push(rel_path);
                    }
                }
                ChangeKind::Create | ChangeKind::Modify => match self.fingerprints.update(&path) {
                    Some(FileChange::Unchanged) => {
                        if self.verbose {
                            println!("  Skipped (content unchanged): {}", rel_path);
                        }
                    }
                    Some(FileChange::Added) | Some(FileChange::Changed) => {
                        effective.push(rel_path);
                    }
                    // Unreadable mid-event, usually an atomic-save rename;
                    // treat a tracked file as deleted
                    None => {
                        let was_tracked = self.fingerprints.remove(&path);
                        let had_scan = self.scans.remove(&rel_path).is_some();
                        if was_tracked || had_scan {
                            effective.push(rel_path);
                        }
                    }
                },
            }
        }

        if effective.is_empty() {
            return RebuildOutcome::NoEffectiveChanges;
        }

        // Expand to files that import a changed file, by resolved specifier.
        // One hop is enough: only the changed files' own metadata can differ,
        // importers are rescanned in case their specifiers now resolve
        // differently (e.g. a new index.ts shadowing a sibling).
        let mut affected: BTreeSet<String> = BTreeSet::new();
        for changed in &effective {
            affected.insert(changed.clone());
            let variants = path_variants(changed);
            for (file, scan) in &self.scans {
                if imports_match(&scan.imports, &variants) {
                    affected.insert(file.clone());
                }
            }
        }

        // Rescan the affected files that still exist on disk
        let to_scan: Vec<PathBuf> = affected
            .iter()
            .map(|rel| self.root.join(rel))
            .filter(|p| p.is_file())
            .collect();
        let output = self.scanner.scan_files(&self.root, &to_scan);
        for warning in &output.warnings {
            eprintln!("Warning: {}", warning);
        }
        for rel in &affected {
            if !self.root.join(rel).is_file() {
                self.scans.remove(rel);
            }
        }
        for (rel, scan) in output.files {
            self.scans.insert(rel, scan);
        }

        let result = build_result(&self.scans);
        report_duplicates(&result);

        if !self.settings.skip_validate {
            if let Err(failure) = validate(&result) {
                return RebuildOutcome::ValidationFailed {
                    affected: affected.len(),
                    failure,
                };
            }
        }

        let content = render_container(&result, &self.settings.out, !self.settings.skip_validate);
        match write_container(&self.root, &self.settings.out, &content) {
            Ok(outcome) => RebuildOutcome::Emitted {
                affected: affected.len(),
                outcome,
            },
            Err(error) => RebuildOutcome::EmitFailed {
                affected: affected.len(),
                error,
            },
        }
    }
}

pub fn run_watch(args: &WatchArgs, root: &Path, verbose: bool) -> Result<()> {
    // Outer loop: a config change tears the session down and starts over with
    // freshly loaded settings
    loop {
        let config = Config::load(root);
        let settings = BuildSettings::resolve(&args.common, &config);
        let debounce = Duration::from_millis(args.debounce.unwrap_or(config.watch.debounce));
        let clear = args.clear || config.watch.clear;
        let options = CompilerOptions::load(root, &settings.tsconfig);
        let src_dir = root.join(&settings.src);

        println!("Running initial build...");
        let mut coordinator = WatchCoordinator::new(root, settings, options, verbose);
        coordinator.initial_build();

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            notify::Config::default(),
        )?;

        // Root non-recursively for the config files, the source dir for code
        watcher.watch(root, RecursiveMode::NonRecursive)?;
        if src_dir.is_dir() {
            watcher.watch(&src_dir, RecursiveMode::Recursive)?;
        }
        if verbose {
            println!("Watching: {}", src_dir.display());
        }
        println!("Watching for changes... (press Ctrl+C to stop)");

        let mut last_event = Instant::now();
        let poll_interval = Duration::from_millis(50);

        loop {
            match rx.recv_timeout(poll_interval) {
                Ok(event) => {
                    coordinator.note_event(&event);
                    last_event = Instant::now();
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if last_event.elapsed() < debounce {
                        continue;
                    }
                    if coordinator.take_config_dirty() {
                        println!("Configuration changed, restarting watch...");
                        break; // Drops the watcher; outer loop reloads
                    }
                    if !coordinator.has_pending() {
                        continue;
                    }
                    if clear {
                        // Clear terminal (ANSI escape code)
                        print!("\x1B[2J\x1B[1;1H");
                    }
                    let timestamp = wall_clock_timestamp();
                    match coordinator.rebuild_pending() {
                        RebuildOutcome::NoEffectiveChanges => {
                            if verbose {
                                println!("[{}] No effective changes", timestamp);
                            }
                        }
                        RebuildOutcome::Emitted { affected, outcome } => match outcome {
                            EmitOutcome::Written => println!(
                                "[{}] Rebuilt after {} affected file(s)",
                                timestamp, affected
                            ),
                            EmitOutcome::Unchanged => println!(
                                "[{}] {} affected file(s), container unchanged",
                                timestamp, affected
                            ),
                        },
                        RebuildOutcome::ValidationFailed { affected, failure } => {
                            eprintln!(
                                "[{}] Rebuild of {} affected file(s) failed validation:",
                                timestamp, affected
                            );
                            eprintln!("{}", failure);
                            eprintln!("Keeping previous container; watching for fixes...");
                        }
                        RebuildOutcome::EmitFailed { affected, error } => {
                            eprintln!(
                                "[{}] Rebuild of {} affected file(s) could not be written: {}",
                                timestamp, affected, error
                            );
                            eprintln!("Keeping previous container; watching for fixes...");
                        }
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    println!("Watcher disconnected");
                    return Ok(());
                }
            }
        }
    }
}

/// Simple timestamp without external crate
fn wall_clock_timestamp() -> String {
    use std::time::SystemTime;
    let duration = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let hours = (secs / 3600) % 24;
    let mins = (secs / 60) % 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}
