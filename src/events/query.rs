//! Filtering and ordering of log snapshots.
//!
//! Views are recomputed from scratch on every call; the log is bounded so
//! an O(n log n) pass per refresh is acceptable.

use std::cmp::Reverse;

use crate::types::{FileEvent, Filter, SortOption};

impl Filter {
    /// Check an entry against every active criterion.
    ///
    /// The operation criterion is exact equality with the mask, not a subset
    /// test: a `CREATE|WRITE` entry does not match a `WRITE` mask.
    pub fn matches(&self, event: &FileEvent) -> bool {
        if !self.path.is_empty() {
            let haystack = event.path.to_string_lossy().to_lowercase();
            if !haystack.contains(&self.path.to_lowercase()) {
                return false;
            }
        }

        if !self.operation.is_empty() && event.operation != self.operation {
            return false;
        }

        if event.is_dir && !self.show_dirs {
            return false;
        }
        if !event.is_dir && !self.show_files {
            return false;
        }

        true
    }
}

/// Sort entries in place.
pub fn sort_events(events: &mut [FileEvent], sort: SortOption) {
    match sort {
        SortOption::Time => events.sort_by_key(|e| Reverse(e.timestamp)),
        SortOption::Path => events.sort_by(|a, b| a.path.as_os_str().cmp(b.path.as_os_str())),
        SortOption::Operation => events.sort_by_key(|e| e.operation.bits()),
        SortOption::Count => events.sort_by_key(|e| Reverse(e.count)),
    }
}

/// Collect the entries passing `filter`, ordered by `sort`.
pub fn filter_and_sort<'a>(
    events: impl IntoIterator<Item = &'a FileEvent>,
    filter: &Filter,
    sort: SortOption,
) -> Vec<FileEvent> {
    let mut selected: Vec<FileEvent> = events
        .into_iter()
        .filter(|event| filter.matches(event))
        .cloned()
        .collect();
    sort_events(&mut selected, sort);
    selected
}
