//! Error types for the watch manager.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Failed to walk {path}: {reason}")]
    WalkFailed { path: PathBuf, reason: String },

    #[error("File system event error: {details}")]
    EventError { details: String },

    #[error("Watcher is closed")]
    Closed,
}

impl WatchError {
    pub(crate) fn path_watch(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        WatchError::PathWatchFailed {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

impl From<walkdir::Error> for WatchError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(PathBuf::from).unwrap_or_default();
        WatchError::WalkFailed {
            path,
            reason: e.to_string(),
        }
    }
}
