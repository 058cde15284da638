//! Coalesces raw notifications into counted log entries.
//!
//! Repeated `(path, operation)` notifications arriving within one second of
//! the matching entry's latest timestamp increment that entry's count instead
//! of appending. Aggregation can be toggled off and back on without losing
//! notifications: disabling expands every counted entry into individual
//! entries, enabling folds them again.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Local, TimeDelta};

use crate::types::{FileEvent, Operation};

use super::store::EventStore;

/// Width of the aggregation window in milliseconds.
pub const AGGREGATION_WINDOW_MS: i64 = 1000;

fn within_window(earlier: DateTime<Local>, later: DateTime<Local>) -> bool {
    later.signed_duration_since(earlier) < TimeDelta::milliseconds(AGGREGATION_WINDOW_MS)
}

/// Owns the event log and applies the aggregation policy to it.
///
/// Designed for a single owner; callers sharing one across threads must
/// wrap it in their own lock.
#[derive(Debug, Clone)]
pub struct EventAggregator {
    store: EventStore,
    enabled: bool,
}

impl EventAggregator {
    /// Create an aggregator with aggregation enabled.
    pub fn new(max_events: usize) -> Self {
        Self::with_store(EventStore::new(max_events), true)
    }

    pub fn with_store(store: EventStore, enabled: bool) -> Self {
        Self { store, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Record a notification observed now.
    pub fn ingest(&mut self, path: PathBuf, operation: Operation, is_dir: bool) -> FileEvent {
        self.ingest_at(path, operation, is_dir, Local::now())
    }

    /// Record a notification observed at `now`.
    ///
    /// Returns the log entry that absorbed it.
    pub fn ingest_at(
        &mut self,
        path: PathBuf,
        operation: Operation,
        is_dir: bool,
        now: DateTime<Local>,
    ) -> FileEvent {
        if self.enabled {
            let existing = self.store.iter_mut().find(|event| {
                event.path == path
                    && event.operation == operation
                    && within_window(event.timestamp, now)
            });
            if let Some(event) = existing {
                event.count += 1;
                event.timestamp = now;
                return event.clone();
            }
        }

        let event = FileEvent::new(path, operation, now, is_dir);
        let evicted = self.store.push(event.clone());
        if !evicted.is_empty() {
            crate::debug_event!("events", "evicted", "{} oldest entries", evicted.len());
        }
        event
    }

    /// Flip aggregation, expanding or folding the log accordingly.
    ///
    /// Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        if enabled {
            self.enable_aggregation();
        } else {
            self.disable_aggregation();
        }
    }

    /// Split every counted entry into `count` individual entries.
    ///
    /// Clones keep the source's path, operation, timestamp and kind, and sit
    /// contiguously where the source stood.
    pub fn disable_aggregation(&mut self) {
        self.enabled = false;

        let mut expanded = Vec::with_capacity(self.store.len());
        for event in self.store.take_all() {
            let count = event.count;
            if count > 1 {
                let single = FileEvent { count: 1, ..event };
                expanded.extend(std::iter::repeat_n(single, count as usize));
            } else {
                expanded.push(event);
            }
        }
        self.restore(expanded);
    }

    /// Fold the log back into counted entries in one left-to-right pass.
    ///
    /// An entry joins the running aggregate for its `(path, operation)` when
    /// it falls within one second of that aggregate's current timestamp;
    /// otherwise it starts a new aggregate for the same key. A key whose
    /// history has gaps therefore yields several entries.
    ///
    /// Joining adds the entry's own `count` rather than one, so entries that
    /// are still counted (for example from an import made while aggregation
    /// was off) keep their occurrences.
    pub fn enable_aggregation(&mut self) {
        self.enabled = true;
        if self.store.is_empty() {
            return;
        }

        let mut folded: Vec<FileEvent> = Vec::with_capacity(self.store.len());
        let mut running: HashMap<(PathBuf, Operation), usize> = HashMap::new();

        for event in self.store.take_all() {
            let key = (event.path.clone(), event.operation);
            match running.get(&key) {
                Some(&index) if within_window(folded[index].timestamp, event.timestamp) => {
                    let aggregate = &mut folded[index];
                    aggregate.count += event.count;
                    if event.timestamp > aggregate.timestamp {
                        aggregate.timestamp = event.timestamp;
                    }
                }
                _ => {
                    running.insert(key, folded.len());
                    folded.push(event);
                }
            }
        }
        self.restore(folded);
    }

    /// Replace the whole log, e.g. after an import.
    pub fn replace_events(&mut self, events: Vec<FileEvent>) {
        self.store.replace(events);
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    // Toggling must not drop entries, so the capacity bound is not applied
    // here; the next ingest trims the log back down.
    fn restore(&mut self, events: Vec<FileEvent>) {
        self.store.extend_unbounded(events);
    }
}
