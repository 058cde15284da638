//! Event log: aggregation, bounded storage and filtered views.
//!
//! ```text
//! notification -> EventAggregator::ingest -> EventStore (bounded, FIFO)
//!                                                 |
//!                                  query::filter_and_sort -> view
//! ```

mod aggregator;
pub mod query;
mod store;

pub use aggregator::{AGGREGATION_WINDOW_MS, EventAggregator};
pub use query::{filter_and_sort, sort_events};
pub use store::{DEFAULT_MAX_EVENTS, EventStore};
