//! JSON export and import of the event log.
//!
//! The document carries the log in insertion order plus a small metadata
//! block:
//!
//! ```json
//! {
//!   "events": [{ "path": "/a", "operation": "WRITE", "timestamp": "...", "is_dir": false, "count": 3 }],
//!   "meta": { "export_time": "2024-05-01T10:00:00+02:00", "total_count": 1 }
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::FileEvent;

/// Prefix shared by every generated export file name.
pub const EXPORT_PREFIX: &str = "treewatch-events_";

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid event document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type PersistResult<T> = Result<T, PersistError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportMeta {
    pub export_time: DateTime<Local>,
    pub total_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub events: Vec<FileEvent>,
    pub meta: ExportMeta,
}

/// Write `events` as a pretty-printed JSON document.
pub fn export_json(events: &[FileEvent], path: impl AsRef<Path>) -> PersistResult<()> {
    let path = path.as_ref();
    let document = ExportDocument {
        events: events.to_vec(),
        meta: ExportMeta {
            export_time: Local::now(),
            total_count: events.len(),
        },
    };

    let json = serde_json::to_string_pretty(&document).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    crate::log_event!("persist", "exported", "{} events to {}", events.len(), path.display());
    Ok(())
}

/// Read a JSON document written by [`export_json`].
///
/// `meta.total_count` is informational; the events array is authoritative.
/// An entry with a zero `count` is read as a single occurrence.
pub fn import_json(path: impl AsRef<Path>) -> PersistResult<Vec<FileEvent>> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document: ExportDocument =
        serde_json::from_str(&data).map_err(|source| PersistError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    if document.meta.total_count != document.events.len() {
        tracing::warn!(
            "[persist] {} declares {} events but holds {}",
            path.display(),
            document.meta.total_count,
            document.events.len()
        );
    }
    for event in document.events.iter_mut().filter(|e| e.count == 0) {
        tracing::warn!(
            "[persist] {}: entry for {} has count 0, reading it as 1",
            path.display(),
            event.path.display()
        );
        event.count = 1;
    }
    crate::log_event!(
        "persist",
        "imported",
        "{} events from {}",
        document.events.len(),
        path.display()
    );
    Ok(document.events)
}

/// File name for an export taken at `now`, e.g.
/// `treewatch-events_2024-05-01_10-00-00.json`.
pub fn default_export_filename(now: DateTime<Local>) -> String {
    format!("{EXPORT_PREFIX}{}.json", now.format("%Y-%m-%d_%H-%M-%S"))
}

/// Most recent export in `dir`, judged by the timestamp in its name.
pub fn latest_export(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let pattern = dir.as_ref().join(format!("{EXPORT_PREFIX}*.json"));
    let pattern = pattern.to_str()?;
    // The timestamp format sorts lexically.
    glob::glob(pattern).ok()?.filter_map(Result::ok).max()
}
