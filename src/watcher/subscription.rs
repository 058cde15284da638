//! Notification primitive behind the watch manager.
//!
//! A [`Subscription`] watches individual directories (never recursively);
//! the manager walks trees itself. Subscriptions come from a
//! [`SubscriptionFactory`] so the manager can throw one away and open a
//! fresh one during a rebuild. Every subscription opened by the same
//! [`NotifyFactory`] feeds the same pair of channels, so consumers never
//! notice a rebuild.

use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, unbounded};
use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::error::WatchError;
use crate::types::Operation;

/// A raw change reported for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub path: PathBuf,
    pub operation: Operation,
}

/// One live subscription to directory changes.
pub trait Subscription: Send + Sync {
    /// Watch `path` (non-recursively).
    fn add(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Stop watching `path`.
    fn remove(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Release every watch held by this subscription.
    fn close(self: Box<Self>) -> Result<(), WatchError>;
}

/// Source of fresh subscriptions sharing one output stream.
pub trait SubscriptionFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn Subscription>, WatchError>;
}

/// Receiving ends of the notification stream.
///
/// Both channels disconnect once the factory and every subscription it
/// opened have been dropped.
#[derive(Debug)]
pub struct Notifications {
    pub events: Receiver<Notification>,
    pub errors: Receiver<WatchError>,
}

/// Map a notify event kind onto an [`Operation`].
///
/// Access and unclassified events carry no change and map to `None`.
pub fn operation_for(kind: &EventKind) -> Option<Operation> {
    match kind {
        EventKind::Create(_) => Some(Operation::CREATE),
        EventKind::Modify(ModifyKind::Name(_)) => Some(Operation::RENAME),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(Operation::CHMOD),
        EventKind::Modify(_) => Some(Operation::WRITE),
        EventKind::Remove(_) => Some(Operation::REMOVE),
        EventKind::Any => Some(Operation::WRITE),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

/// Factory for subscriptions backed by the platform's recommended watcher.
#[derive(Debug)]
pub struct NotifyFactory {
    events: Sender<Notification>,
    errors: Sender<WatchError>,
}

impl NotifyFactory {
    /// Create a factory together with the receiving side of its stream.
    pub fn channel() -> (Self, Notifications) {
        let (event_tx, event_rx) = unbounded();
        let (error_tx, error_rx) = unbounded();
        (
            Self {
                events: event_tx,
                errors: error_tx,
            },
            Notifications {
                events: event_rx,
                errors: error_rx,
            },
        )
    }
}

impl SubscriptionFactory for NotifyFactory {
    fn open(&self) -> Result<Box<dyn Subscription>, WatchError> {
        let events = self.events.clone();
        let errors = self.errors.clone();

        let watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    let Some(operation) = operation_for(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        // The receiver is gone only during shutdown.
                        let _ = events.send(Notification { path, operation });
                    }
                }
                Err(e) => {
                    let _ = errors.send(WatchError::EventError {
                        details: e.to_string(),
                    });
                }
            },
        )?;

        crate::debug_event!("watcher", "subscription opened");
        Ok(Box::new(NotifySubscription {
            watcher: Mutex::new(watcher),
        }))
    }
}

/// Subscription wrapping a [`RecommendedWatcher`].
pub struct NotifySubscription {
    watcher: Mutex<RecommendedWatcher>,
}

impl Subscription for NotifySubscription {
    fn add(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .get_mut()
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::path_watch(path, e))
    }

    fn remove(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .get_mut()
            .unwatch(path)
            .map_err(|e| WatchError::path_watch(path, e))
    }

    fn close(self: Box<Self>) -> Result<(), WatchError> {
        // Dropping the watcher stops its event thread and releases the
        // handler's senders.
        drop(self);
        crate::debug_event!("watcher", "subscription closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};

    #[test]
    fn test_operation_mapping() {
        assert_eq!(
            operation_for(&EventKind::Create(CreateKind::Folder)),
            Some(Operation::CREATE)
        );
        assert_eq!(
            operation_for(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(Operation::WRITE)
        );
        assert_eq!(
            operation_for(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Some(Operation::RENAME)
        );
        assert_eq!(
            operation_for(&EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Permissions
            ))),
            Some(Operation::CHMOD)
        );
        assert_eq!(
            operation_for(&EventKind::Remove(RemoveKind::File)),
            Some(Operation::REMOVE)
        );
        assert_eq!(operation_for(&EventKind::Any), Some(Operation::WRITE));
        assert_eq!(operation_for(&EventKind::Access(AccessKind::Any)), None);
        assert_eq!(operation_for(&EventKind::Other), None);
    }

    #[test]
    fn test_channels_close_when_factory_dropped() {
        let (factory, notifications) = NotifyFactory::channel();
        drop(factory);
        assert!(notifications.events.recv().is_err());
        assert!(notifications.errors.recv().is_err());
    }
}
