//! Bounded, insertion-ordered event log.

use std::collections::VecDeque;

use crate::types::{FileEvent, Filter, SortOption};

use super::query;

/// Default capacity of the event log.
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// Holds the live log in insertion order.
///
/// Eviction is FIFO by insertion position, not by timestamp: an aggregated
/// entry keeps the slot of its first occurrence while its timestamp advances.
#[derive(Debug, Clone)]
pub struct EventStore {
    events: VecDeque<FileEvent>,
    max_events: usize,
}

impl EventStore {
    /// Create an empty log holding at most `max_events` entries (minimum 1).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_events: max_events.max(1),
        }
    }

    /// Append an entry, evicting from the front until the log fits.
    ///
    /// Returns the evicted entries, oldest first.
    pub fn push(&mut self, event: FileEvent) -> Vec<FileEvent> {
        self.events.push_back(event);
        let mut evicted = Vec::new();
        while self.events.len() > self.max_events {
            if let Some(oldest) = self.events.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    /// Replace the whole log, keeping the newest `max_events` entries.
    pub fn replace(&mut self, events: impl IntoIterator<Item = FileEvent>) {
        self.events = events.into_iter().collect();
        let overflow = self.events.len().saturating_sub(self.max_events);
        self.events.drain(..overflow);
    }

    /// Append without applying the capacity bound.
    pub(crate) fn extend_unbounded(&mut self, events: impl IntoIterator<Item = FileEvent>) {
        self.events.extend(events);
    }

    /// Remove every entry, handing them back in order.
    pub fn take_all(&mut self) -> Vec<FileEvent> {
        self.events.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEvent> {
        self.events.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut FileEvent> {
        self.events.iter_mut()
    }

    /// Snapshot of the log in insertion order.
    pub fn to_vec(&self) -> Vec<FileEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Filtered and sorted copy of the log.
    pub fn query(&self, filter: &Filter, sort: SortOption) -> Vec<FileEvent> {
        query::filter_and_sort(self.events.iter(), filter, sort)
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS)
    }
}
