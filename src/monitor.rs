//! Controller tying the watch manager to the event log.
//!
//! [`Monitor`] is the single owner of presentation state: the aggregator,
//! the active filter and the sort order. Everything else reaches that state
//! through its methods, so the ingestion worker and a front end can share
//! one monitor behind an `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{never, select};
use parking_lot::Mutex;

use crate::config::EventsConfig;
use crate::events::{EventAggregator, EventStore};
use crate::persistence::{self, PersistResult};
use crate::types::{FileEvent, Filter, Operation, SortOption};
use crate::watcher::{Notification, Notifications, WatchControl, WatchError};

/// Mutable presentation state guarded by the monitor's lock.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub aggregator: EventAggregator,
    pub filter: Filter,
    pub sort: SortOption,
}

impl MonitorState {
    pub fn from_config(config: &EventsConfig) -> Self {
        let store = EventStore::new(config.max_events);
        Self {
            aggregator: EventAggregator::with_store(store, config.aggregate),
            filter: Filter {
                show_dirs: config.show_dirs,
                show_files: config.show_files,
                ..Filter::default()
            },
            sort: config.sort,
        }
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::from_config(&EventsConfig::default())
    }
}

pub struct Monitor {
    watcher: Arc<dyn WatchControl>,
    state: Mutex<MonitorState>,
}

impl Monitor {
    pub fn new(watcher: Arc<dyn WatchControl>, config: &EventsConfig) -> Self {
        Self::with_state(watcher, MonitorState::from_config(config))
    }

    pub fn with_state(watcher: Arc<dyn WatchControl>, state: MonitorState) -> Self {
        Self {
            watcher,
            state: Mutex::new(state),
        }
    }

    /// Drain both notification channels until they disconnect.
    ///
    /// Blocks the calling thread. Each ingested entry is passed to
    /// `on_event` after the state lock is released. Errors from the watch
    /// backend are logged and otherwise ignored. Returns once the manager
    /// has been closed and every subscription dropped.
    pub fn run(&self, notifications: Notifications, mut on_event: impl FnMut(&FileEvent)) {
        let Notifications { events, errors } = notifications;
        let no_events = never();
        let no_errors = never();
        let mut events_open = true;
        let mut errors_open = true;

        while events_open || errors_open {
            let event_rx = if events_open { &events } else { &no_events };
            let error_rx = if errors_open { &errors } else { &no_errors };

            select! {
                recv(event_rx) -> msg => match msg {
                    Ok(notification) => {
                        let entry = self.handle(notification);
                        on_event(&entry);
                    }
                    Err(_) => events_open = false,
                },
                recv(error_rx) -> msg => match msg {
                    Ok(e) => tracing::error!("[monitor] watch backend error: {e}"),
                    Err(_) => errors_open = false,
                },
            }
        }

        crate::debug_event!("monitor", "notification channels closed");
    }

    /// Process one notification: classify the path, follow new directories
    /// and record the change.
    pub fn handle(&self, notification: Notification) -> FileEvent {
        let Notification { path, operation } = notification;
        let is_dir = std::fs::metadata(&path)
            .map(|meta| meta.is_dir())
            .unwrap_or(false);

        if is_dir && operation.contains(Operation::CREATE) {
            match self.watcher.add_directory(&path) {
                Ok(()) => crate::debug_event!("monitor", "following", "{}", path.display()),
                Err(e) => tracing::warn!("[monitor] cannot watch new directory: {e}"),
            }
        }

        self.ingest(path, operation, is_dir)
    }

    pub fn ingest(&self, path: PathBuf, operation: Operation, is_dir: bool) -> FileEvent {
        self.state.lock().aggregator.ingest(path, operation, is_dir)
    }

    /// The log filtered and sorted by the current settings.
    pub fn filtered_events(&self) -> Vec<FileEvent> {
        let state = self.state.lock();
        state.aggregator.store().query(&state.filter, state.sort)
    }

    /// The whole log in insertion order.
    pub fn events(&self) -> Vec<FileEvent> {
        self.state.lock().aggregator.store().to_vec()
    }

    pub fn event_count(&self) -> usize {
        self.state.lock().aggregator.store().len()
    }

    pub fn watched_count(&self) -> usize {
        self.watcher.watched_count()
    }

    pub fn watched_count_for_root(&self, root: &Path) -> usize {
        self.watcher.watched_count_for_root(root)
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watcher.is_watching(path)
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.watcher.roots()
    }

    pub fn add_root(&self, root: &Path) -> Result<(), WatchError> {
        self.watcher.add_root(root)
    }

    pub fn remove_root(&self, root: &Path) -> Result<(), WatchError> {
        self.watcher.remove_root(root)
    }

    pub fn add_directory(&self, path: &Path) -> Result<(), WatchError> {
        self.watcher.add_directory(path)
    }

    /// Switch between aggregated and individual views. Returns the new state.
    pub fn toggle_aggregation(&self) -> bool {
        let enabled = self.state.lock().aggregator.toggle();
        crate::debug_event!("monitor", "aggregation", "{enabled}");
        enabled
    }

    pub fn is_aggregating(&self) -> bool {
        self.state.lock().aggregator.is_enabled()
    }

    pub fn toggle_files(&self) -> bool {
        let mut state = self.state.lock();
        state.filter.show_files = !state.filter.show_files;
        state.filter.show_files
    }

    pub fn toggle_dirs(&self) -> bool {
        let mut state = self.state.lock();
        state.filter.show_dirs = !state.filter.show_dirs;
        state.filter.show_dirs
    }

    /// Advance to the next sort order and return it.
    pub fn cycle_sort(&self) -> SortOption {
        let mut state = self.state.lock();
        state.sort = state.sort.next();
        state.sort
    }

    pub fn set_sort(&self, sort: SortOption) {
        self.state.lock().sort = sort;
    }

    /// Set the path substring filter; an empty string clears it.
    pub fn set_path_filter(&self, path: impl Into<String>) {
        self.state.lock().filter.path = path.into();
    }

    /// Set the operation filter; the empty operation clears it.
    pub fn set_operation_filter(&self, operation: Operation) {
        self.state.lock().filter.operation = operation;
    }

    pub fn filter(&self) -> Filter {
        self.state.lock().filter.clone()
    }

    pub fn sort(&self) -> SortOption {
        self.state.lock().sort
    }

    /// One-line summary of what is watched and how the log is shown.
    pub fn status_line(&self) -> String {
        let roots = self.watcher.roots();
        let watched = self.watcher.watched_count();
        let state = self.state.lock();
        let mark = |on: bool| if on { "✓" } else { "✗" };

        let mut line = format!(
            "Watching: {} roots ({watched} dirs) | Events: {} | Sort: {} | Dirs: {} | Files: {} | Aggregate: {}",
            roots.len(),
            state.aggregator.store().len(),
            state.sort,
            mark(state.filter.show_dirs),
            mark(state.filter.show_files),
            mark(state.aggregator.is_enabled()),
        );
        if !state.filter.path.is_empty() {
            line.push_str(&format!(" | Path Filter: {}", state.filter.path));
        }
        if !state.filter.operation.is_empty() {
            line.push_str(&format!(" | Op Filter: {}", state.filter.operation));
        }
        line
    }

    /// Write the whole log to `path`. Returns the number of entries written.
    pub fn export_json(&self, path: impl AsRef<Path>) -> PersistResult<usize> {
        let events = self.events();
        persistence::export_json(&events, path)?;
        Ok(events.len())
    }

    /// Replace the whole log with the contents of `path`.
    ///
    /// Only the newest entries that fit the log's capacity are kept. With
    /// aggregation off, counted entries are expanded into single ones.
    /// Returns the number of entries now in the log.
    pub fn import_json(&self, path: impl AsRef<Path>) -> PersistResult<usize> {
        let events = persistence::import_json(path)?;
        let mut state = self.state.lock();
        state.aggregator.replace_events(events);
        if !state.aggregator.is_enabled() {
            state.aggregator.disable_aggregation();
        }
        Ok(state.aggregator.store().len())
    }

    /// Close the watch manager, which ends [`run`](Self::run).
    pub fn close(&self) -> Result<(), WatchError> {
        self.watcher.close()
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("roots", &self.watcher.roots())
            .field("events", &self.event_count())
            .finish()
    }
}
