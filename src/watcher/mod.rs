//! Recursive multi-root directory watching.
//!
//! # Architecture
//!
//! ```text
//! RecursiveWatchManager (WatchControl)
//!   - RwLock<WatchState>
//!       - WatchRegistry (roots + watched directories)
//!       - Box<dyn Subscription> (one per rebuild)
//!   - Box<dyn SubscriptionFactory>
//!         |
//!   NotifyFactory -> Notifications { events, errors }
//! ```
//!
//! The notify backend is used non-recursively; the manager walks trees and
//! subscribes each directory itself so it always knows exactly which
//! directories are covered.

mod error;
mod manager;
mod registry;
mod subscription;

pub use error::WatchError;
pub use manager::{RecursiveWatchManager, WatchControl};
pub use registry::WatchRegistry;
pub use subscription::{
    Notification, Notifications, NotifyFactory, NotifySubscription, Subscription,
    SubscriptionFactory, operation_for,
};
