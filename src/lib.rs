//! Recursive multi-root directory watching with an aggregated,
//! filterable event log.

pub mod cli;
pub mod config;
pub mod events;
pub mod logging;
pub mod monitor;
pub mod persistence;
pub mod types;
pub mod utils;
pub mod watcher;

pub use config::Settings;
pub use events::{EventAggregator, EventStore};
pub use monitor::{Monitor, MonitorState};
pub use types::{FileEvent, Filter, Operation, SortOption};
pub use watcher::{NotifyFactory, RecursiveWatchManager, WatchControl, WatchError};
