//! Bookkeeping for roots and subscribed directories.
//!
//! Pure data: the manager owns the lock and the subscription, the registry
//! only records what is currently watched.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Ordered root set plus the set of every directory with a live watch.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    roots: Vec<PathBuf>,
    watched: HashSet<PathBuf>,
}

/// Resolve symlinks, falling back to the path as given when it cannot be
/// resolved (e.g. it no longer exists).
fn resolve(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a root. Returns false if it was already present.
    pub fn add_root(&mut self, root: PathBuf) -> bool {
        if self.has_root(&root) {
            return false;
        }
        self.roots.push(root);
        true
    }

    /// Drop a root from the set, leaving its watched directories in place.
    ///
    /// Returns false if the root was unknown.
    pub fn remove_root(&mut self, root: &Path) -> bool {
        let before = self.roots.len();
        self.roots.retain(|r| r != root);
        self.roots.len() != before
    }

    pub fn has_root(&self, root: &Path) -> bool {
        self.roots.iter().any(|r| r == root)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Record a directory as watched. Returns false if already recorded.
    pub fn record(&mut self, path: PathBuf) -> bool {
        self.watched.insert(path)
    }

    pub fn forget(&mut self, path: &Path) -> bool {
        self.watched.remove(path)
    }

    /// True if `path` is a root or a recorded directory.
    pub fn is_watching(&self, path: &Path) -> bool {
        self.has_root(path) || self.watched.contains(path)
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    pub fn watched(&self) -> impl Iterator<Item = &Path> {
        self.watched.iter().map(PathBuf::as_path)
    }

    /// Number of watched directories contained in `root`, root included.
    ///
    /// Both sides are resolved through symlinks and compared by component,
    /// so a symlinked root or a trailing separator does not skew the count.
    pub fn count_under(&self, root: &Path) -> usize {
        let resolved_root = resolve(root);
        self.watched
            .iter()
            .filter(|path| resolve(path).starts_with(&resolved_root))
            .count()
    }

    /// Watched directories contained in `root`, using the same containment
    /// rule as [`count_under`](Self::count_under).
    pub fn paths_under(&self, root: &Path) -> Vec<PathBuf> {
        let resolved_root = resolve(root);
        self.watched
            .iter()
            .filter(|path| resolve(path).starts_with(&resolved_root))
            .cloned()
            .collect()
    }

    /// True if `root`'s subtree shares directories with any current root,
    /// either because one contains the other or they resolve to the same
    /// place.
    pub fn overlaps_roots(&self, root: &Path) -> bool {
        let resolved = resolve(root);
        self.roots.iter().any(|other| {
            let other = resolve(other);
            other.starts_with(&resolved) || resolved.starts_with(&other)
        })
    }

    /// Forget every watched directory but keep the roots.
    pub fn clear_watched(&mut self) {
        self.watched.clear();
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.watched.clear();
    }
}
