//! purpose: Per-file content fingerprints for the incremental build
//!     coordinator. A SHA-256 digest per tracked file filters out filesystem
//!     notifications that did not actually change content (editor touches,
//!     atomic-save renames).
//!
//! invariants:
//!     - The cache lives only for the watch process; a cold start always does
//!       a full rescan
//!     - Seeding records baselines without signaling any change

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What a filesystem notification turned out to mean once content hashes
/// are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    /// Not previously tracked; now recorded
    Added,
    /// Tracked and the content hash differs; baseline updated
    Changed,
    /// Tracked and the content hash is identical; event filtered out
    Unchanged,
}

/// Map from file path to content hash, owned exclusively by the watch
/// coordinator.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    hashes: HashMap<PathBuf, String>,
}

/// Hex SHA-256 over the raw file bytes.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record baselines for the given files. Unreadable files are skipped;
    /// they will be picked up as `Added` if they become readable later.
    pub fn seed(&mut self, files: &[PathBuf]) {
        for path in files {
            if let Ok(bytes) = fs::read(path) {
                self.hashes.insert(path.clone(), hash_bytes(&bytes));
            }
        }
    }

    /// Re-hash a file and compare against the recorded baseline, updating it.
    /// Returns None if the file cannot be read (e.g. deleted mid-event).
    pub fn update(&mut self, path: &Path) -> Option<FileChange> {
        let bytes = fs::read(path).ok()?;
        let hash = hash_bytes(&bytes);
        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            None => Some(FileChange::Added),
            Some(previous) if previous == hash => Some(FileChange::Unchanged),
            Some(_) => Some(FileChange::Changed),
        }
    }

    /// Drop a file from tracking. Returns true if it was tracked.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.hashes.remove(path).is_some()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.hashes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_seed_records_baselines() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.ts");
        let b = temp.path().join("b.ts");
        fs::write(&a, "export class A {}").unwrap();
        fs::write(&b, "export class B {}").unwrap();

        let mut cache = FingerprintCache::new();
        cache.seed(&[a.clone(), b.clone()]);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&a));
        assert!(cache.contains(&b));
    }

    #[test]
    fn test_touch_without_content_change_is_unchanged() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.ts");
        fs::write(&a, "export class A {}").unwrap();

        let mut cache = FingerprintCache::new();
        cache.seed(&[a.clone()]);

        // Rewrite identical content (what editors often do on save)
        fs::write(&a, "export class A {}").unwrap();
        assert_eq!(cache.update(&a), Some(FileChange::Unchanged));
    }

    #[test]
    fn test_content_change_detected() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.ts");
        fs::write(&a, "export class A {}").unwrap();

        let mut cache = FingerprintCache::new();
        cache.seed(&[a.clone()]);

        fs::write(&a, "export class A { changed = true }").unwrap();
        assert_eq!(cache.update(&a), Some(FileChange::Changed));
        // Baseline moved forward: the same content is now unchanged
        assert_eq!(cache.update(&a), Some(FileChange::Unchanged));
    }

    #[test]
    fn test_untracked_file_is_added() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.ts");
        fs::write(&a, "export class A {}").unwrap();

        let mut cache = FingerprintCache::new();
        assert_eq!(cache.update(&a), Some(FileChange::Added));
    }

    #[test]
    fn test_remove_drops_tracking() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.ts");
        fs::write(&a, "export class A {}").unwrap();

        let mut cache = FingerprintCache::new();
        cache.seed(&[a.clone()]);
        assert!(cache.remove(&a));
        assert!(!cache.remove(&a));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_update_missing_file_returns_none() {
        let temp = TempDir::new().unwrap();
        let mut cache = FingerprintCache::new();
        assert_eq!(cache.update(&temp.path().join("gone.ts")), None);
    }
}
