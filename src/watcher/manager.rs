//! Recursive watching over a dynamic set of roots.
//!
//! The manager keeps one subscription whose coverage equals every directory
//! reachable from the current roots. Adding a root walks its tree and
//! subscribes each directory. Removing a root unsubscribes its directories
//! directly when no surviving root shares them; otherwise the subscription
//! is torn down and rebuilt from the surviving roots.
//!
//! Walks and subscribe calls run while the write lock is held. Callers
//! must not race `close` against `add_*`.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use walkdir::WalkDir;

use super::error::WatchError;
use super::registry::WatchRegistry;
use super::subscription::{Subscription, SubscriptionFactory};

/// Control surface of a watch manager, as seen by the monitor.
pub trait WatchControl: Send + Sync {
    fn add_root(&self, root: &Path) -> Result<(), WatchError>;
    fn remove_root(&self, root: &Path) -> Result<(), WatchError>;
    fn add_directory(&self, path: &Path) -> Result<(), WatchError>;
    fn is_watching(&self, path: &Path) -> bool;
    fn watched_count(&self) -> usize;
    fn watched_count_for_root(&self, root: &Path) -> usize;
    fn roots(&self) -> Vec<PathBuf>;
    fn close(&self) -> Result<(), WatchError>;
}

struct WatchState {
    factory: Option<Box<dyn SubscriptionFactory>>,
    /// `None` once closed.
    subscription: Option<Box<dyn Subscription>>,
    registry: WatchRegistry,
}

impl WatchState {
    fn subscription(&mut self) -> Result<&mut (dyn Subscription + 'static), WatchError> {
        self.subscription.as_deref_mut().ok_or(WatchError::Closed)
    }
}

/// Watch manager maintaining one subscription across many roots.
pub struct RecursiveWatchManager {
    state: RwLock<WatchState>,
    rebuild_on_remove: bool,
}

fn normalize(path: &Path) -> Result<PathBuf, WatchError> {
    std::path::absolute(path).map_err(|e| WatchError::path_watch(path, e))
}

fn normalize_lossy(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Depth-first walk of `root`, subscribing and recording every directory.
///
/// Stops at the first failure; directories registered before it stay
/// registered.
fn walk_into(
    subscription: &mut dyn Subscription,
    registry: &mut WatchRegistry,
    root: &Path,
) -> Result<usize, WatchError> {
    let mut added = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        subscription.add(entry.path())?;
        if registry.record(entry.path().to_path_buf()) {
            added += 1;
        }
    }
    Ok(added)
}

impl RecursiveWatchManager {
    /// Create a manager with a single root, without walking it yet.
    ///
    /// Call [`add_all_roots_recursive`](Self::add_all_roots_recursive) to
    /// start watching.
    pub fn new(
        factory: impl SubscriptionFactory + 'static,
        root: impl AsRef<Path>,
    ) -> Result<Self, WatchError> {
        let root = normalize(root.as_ref())?;
        let manager = Self::open(Box::new(factory))?;
        manager.state.write().registry.add_root(root);
        Ok(manager)
    }

    /// Create a manager over several roots and walk each of them, failing
    /// on the first error.
    pub fn with_roots<I, P>(
        factory: impl SubscriptionFactory + 'static,
        roots: I,
    ) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let manager = Self::open(Box::new(factory))?;
        {
            let mut state = manager.state.write();
            for root in roots {
                let root = normalize(root.as_ref())?;
                state.registry.add_root(root);
            }
        }
        manager.add_all_roots_recursive()?;
        Ok(manager)
    }

    fn open(factory: Box<dyn SubscriptionFactory>) -> Result<Self, WatchError> {
        let subscription = factory.open()?;
        Ok(Self {
            state: RwLock::new(WatchState {
                factory: Some(factory),
                subscription: Some(subscription),
                registry: WatchRegistry::new(),
            }),
            rebuild_on_remove: false,
        })
    }

    /// Always rebuild the subscription on root removal instead of
    /// unsubscribing directly.
    pub fn with_rebuild_on_remove(mut self, rebuild: bool) -> Self {
        self.rebuild_on_remove = rebuild;
        self
    }

    /// Walk `root` and watch every directory under it.
    ///
    /// Does not add `root` to the root set.
    pub fn add_recursive(&self, root: impl AsRef<Path>) -> Result<(), WatchError> {
        let root = normalize(root.as_ref())?;
        let mut state = self.state.write();
        let WatchState {
            subscription,
            registry,
            ..
        } = &mut *state;
        let subscription = subscription.as_deref_mut().ok_or(WatchError::Closed)?;
        let added = walk_into(subscription, registry, &root)?;
        crate::debug_event!("watcher", "walked", "{} ({added} new)", root.display());
        Ok(())
    }

    /// Walk every configured root in order, stopping at the first failure.
    pub fn add_all_roots_recursive(&self) -> Result<(), WatchError> {
        for root in self.roots() {
            self.add_recursive(&root)?;
        }
        Ok(())
    }

    /// Directly unsubscribe every directory under `root`.
    fn unwatch_subtree(state: &mut WatchState, root: &Path) -> Result<usize, WatchError> {
        let WatchState {
            subscription,
            registry,
            ..
        } = state;
        let subscription = subscription.as_deref_mut().ok_or(WatchError::Closed)?;
        let mut removed = 0;
        for path in registry.paths_under(root) {
            subscription.remove(&path)?;
            registry.forget(&path);
            removed += 1;
        }
        Ok(removed)
    }

    /// Replace the subscription and re-walk the remaining roots.
    ///
    /// A failure to close the old subscription is logged and ignored; a
    /// failure to re-register a surviving root is returned.
    fn rebuild(state: &mut WatchState) -> Result<(), WatchError> {
        if let Some(old) = state.subscription.take() {
            if let Err(e) = old.close() {
                tracing::warn!("[watcher] failed to close subscription during rebuild: {e}");
            }
        }
        state.registry.clear_watched();

        let factory = state.factory.as_ref().ok_or(WatchError::Closed)?;
        state.subscription = Some(factory.open()?);

        let roots = state.registry.roots().to_vec();
        let WatchState {
            subscription,
            registry,
            ..
        } = state;
        let subscription = subscription.as_deref_mut().ok_or(WatchError::Closed)?;
        for root in &roots {
            walk_into(subscription, registry, root)?;
        }
        crate::log_event!(
            "watcher",
            "rebuilt",
            "{} roots, {} directories",
            roots.len(),
            registry.watched_count()
        );
        Ok(())
    }
}

impl WatchControl for RecursiveWatchManager {
    /// Add a root and watch its tree. Adding a known root is a no-op.
    fn add_root(&self, root: &Path) -> Result<(), WatchError> {
        let root = normalize(root)?;
        let mut state = self.state.write();
        if state.subscription.is_none() {
            return Err(WatchError::Closed);
        }
        if !state.registry.add_root(root.clone()) {
            return Ok(());
        }

        let WatchState {
            subscription,
            registry,
            ..
        } = &mut *state;
        let subscription = subscription.as_deref_mut().ok_or(WatchError::Closed)?;
        let added = walk_into(subscription, registry, &root)?;
        crate::log_event!("watcher", "root added", "{} ({added} directories)", root.display());
        Ok(())
    }

    /// Remove a root and every watch only it was responsible for.
    ///
    /// Removing an unknown root is a no-op.
    fn remove_root(&self, root: &Path) -> Result<(), WatchError> {
        let root = normalize(root)?;
        let mut state = self.state.write();
        if state.subscription.is_none() {
            return Err(WatchError::Closed);
        }
        if !state.registry.remove_root(&root) {
            return Ok(());
        }

        if self.rebuild_on_remove || state.registry.overlaps_roots(&root) {
            return Self::rebuild(&mut state);
        }

        match Self::unwatch_subtree(&mut state, &root) {
            Ok(removed) => {
                crate::log_event!(
                    "watcher",
                    "root removed",
                    "{} ({removed} directories)",
                    root.display()
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "[watcher] direct unwatch of {} failed, rebuilding: {e}",
                    root.display()
                );
                Self::rebuild(&mut state)
            }
        }
    }

    /// Watch a single directory, typically one that was just created.
    fn add_directory(&self, path: &Path) -> Result<(), WatchError> {
        let path = normalize(path)?;
        let mut state = self.state.write();
        state.subscription()?.add(&path)?;
        state.registry.record(path);
        Ok(())
    }

    fn is_watching(&self, path: &Path) -> bool {
        self.state.read().registry.is_watching(&normalize_lossy(path))
    }

    fn watched_count(&self) -> usize {
        self.state.read().registry.watched_count()
    }

    fn watched_count_for_root(&self, root: &Path) -> usize {
        self.state.read().registry.count_under(&normalize_lossy(root))
    }

    fn roots(&self) -> Vec<PathBuf> {
        self.state.read().registry.roots().to_vec()
    }

    /// Release the subscription and forget all roots.
    ///
    /// Closing twice is a no-op.
    fn close(&self) -> Result<(), WatchError> {
        let mut state = self.state.write();
        state.factory = None;
        state.registry.clear();
        match state.subscription.take() {
            Some(subscription) => {
                crate::debug_event!("watcher", "closing");
                subscription.close()
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for RecursiveWatchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("RecursiveWatchManager")
            .field("roots", &state.registry.roots())
            .field("watched", &state.registry.watched_count())
            .field("closed", &state.subscription.is_none())
            .field("rebuild_on_remove", &self.rebuild_on_remove)
            .finish()
    }
}
