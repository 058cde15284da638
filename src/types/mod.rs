//! Core value types shared by the watcher and the event log.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bitflags::bitflags;
use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

bitflags! {
    /// Kind of filesystem change carried by a notification.
    ///
    /// Flags may combine when the platform reports several changes at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Operation: u32 {
        const CREATE = 1;
        const WRITE = 1 << 1;
        const REMOVE = 1 << 2;
        const RENAME = 1 << 3;
        const CHMOD = 1 << 4;
    }
}

/// Rendering precedence when several flags are set.
const LABEL_ORDER: [(Operation, &str); 5] = [
    (Operation::CREATE, "CREATE"),
    (Operation::WRITE, "WRITE"),
    (Operation::REMOVE, "REMOVE"),
    (Operation::RENAME, "RENAME"),
    (Operation::CHMOD, "CHMOD"),
];

impl Operation {
    /// Single label used when rendering a log line.
    ///
    /// Combined operations show the first flag in CREATE, WRITE, REMOVE,
    /// RENAME, CHMOD order.
    pub fn label(self) -> &'static str {
        LABEL_ORDER
            .iter()
            .find(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .unwrap_or("UNKNOWN")
    }

    fn colored_label(self) -> String {
        let label = self.label();
        match label {
            "CREATE" => label.green().to_string(),
            "WRITE" => label.yellow().to_string(),
            "REMOVE" => label.red().to_string(),
            "RENAME" => label.magenta().to_string(),
            "CHMOD" => label.blue().to_string(),
            _ => label.to_string(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown operation: {0}")]
pub struct ParseOperationError(pub String);

impl FromStr for Operation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Operation::empty());
        }

        let mut operation = Operation::empty();
        for part in trimmed.split('|') {
            let name = part.trim().to_ascii_uppercase();
            let flag =
                Operation::from_name(&name).ok_or_else(|| ParseOperationError(part.to_string()))?;
            operation |= flag;
        }
        Ok(operation)
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One displayed log entry, possibly standing for several raw notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    pub path: PathBuf,
    pub operation: Operation,
    pub timestamp: DateTime<Local>,
    pub is_dir: bool,
    /// Number of raw notifications collapsed into this entry (always >= 1).
    pub count: u32,
}

const MAX_RENDERED_PATH: usize = 50;

impl FileEvent {
    pub fn new(
        path: impl Into<PathBuf>,
        operation: Operation,
        timestamp: DateTime<Local>,
        is_dir: bool,
    ) -> Self {
        Self {
            path: path.into(),
            operation,
            timestamp,
            is_dir,
            count: 1,
        }
    }

    /// Render as `[HH:MM:SS] OP T path (count)`.
    pub fn render(&self, color: bool) -> String {
        let operation = if color {
            self.operation.colored_label()
        } else {
            self.operation.label().to_string()
        };
        let kind = if self.is_dir { "D" } else { "F" };
        let count = if self.count > 1 {
            format!(" ({})", self.count)
        } else {
            String::new()
        };

        format!(
            "[{}] {operation} {kind} {}{count}",
            self.timestamp.format("%H:%M:%S"),
            shorten_path(&self.path.to_string_lossy()),
        )
    }
}

fn shorten_path(path: &str) -> String {
    let chars: Vec<char> = path.chars().collect();
    if chars.len() <= MAX_RENDERED_PATH {
        return path.to_string();
    }
    let tail: String = chars[chars.len() - (MAX_RENDERED_PATH - 3)..].iter().collect();
    format!("...{tail}")
}

/// Display filter for the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Case-insensitive path substring; empty means unset.
    pub path: String,
    /// Exact operation to match; empty means unset.
    pub operation: Operation,
    pub show_dirs: bool,
    pub show_files: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            path: String::new(),
            operation: Operation::empty(),
            show_dirs: true,
            show_files: true,
        }
    }
}

/// Ordering applied to filtered views.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    /// Newest first
    #[default]
    Time,
    /// Path, ascending
    Path,
    /// Operation bit value, ascending
    Operation,
    /// Highest count first
    Count,
}

impl SortOption {
    /// Next option in the Time, Path, Operation, Count cycle.
    pub fn next(self) -> Self {
        match self {
            SortOption::Time => SortOption::Path,
            SortOption::Path => SortOption::Operation,
            SortOption::Operation => SortOption::Count,
            SortOption::Count => SortOption::Time,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SortOption::Time => "Time",
            SortOption::Path => "Path",
            SortOption::Operation => "Operation",
            SortOption::Count => "Count",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::WRITE.to_string(), "WRITE");
        assert_eq!((Operation::CREATE | Operation::WRITE).to_string(), "CREATE|WRITE");
        assert_eq!(Operation::empty().to_string(), "NONE");
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!("write".parse::<Operation>().unwrap(), Operation::WRITE);
        assert_eq!(
            "CREATE | chmod".parse::<Operation>().unwrap(),
            Operation::CREATE | Operation::CHMOD
        );
        assert_eq!("".parse::<Operation>().unwrap(), Operation::empty());
        assert!("TOUCH".parse::<Operation>().is_err());
    }

    #[test]
    fn test_operation_label_precedence() {
        assert_eq!((Operation::WRITE | Operation::CHMOD).label(), "WRITE");
        assert_eq!((Operation::RENAME | Operation::REMOVE).label(), "REMOVE");
        assert_eq!(Operation::empty().label(), "UNKNOWN");
    }

    #[test]
    fn test_operation_bits_match_notification_order() {
        assert_eq!(Operation::CREATE.bits(), 1);
        assert_eq!(Operation::WRITE.bits(), 2);
        assert_eq!(Operation::REMOVE.bits(), 4);
        assert_eq!(Operation::RENAME.bits(), 8);
        assert_eq!(Operation::CHMOD.bits(), 16);
    }

    #[test]
    fn test_render_plain() {
        let mut event = FileEvent::new("/tmp/a.txt", Operation::WRITE, at(9, 5, 7), false);
        assert_eq!(event.render(false), "[09:05:07] WRITE F /tmp/a.txt");

        event.count = 3;
        event.is_dir = true;
        assert_eq!(event.render(false), "[09:05:07] WRITE D /tmp/a.txt (3)");
    }

    #[test]
    fn test_render_shortens_long_paths() {
        let long = format!("/{}", "x".repeat(60));
        let event = FileEvent::new(&long, Operation::CREATE, at(1, 2, 3), false);
        let rendered = event.render(false);
        let path_part = rendered.rsplit(' ').next().unwrap();
        assert!(path_part.starts_with("..."));
        assert_eq!(path_part.chars().count(), 50);
    }

    #[test]
    fn test_sort_option_cycle() {
        let mut sort = SortOption::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(sort);
            sort = sort.next();
        }
        assert_eq!(
            seen,
            vec![
                SortOption::Time,
                SortOption::Path,
                SortOption::Operation,
                SortOption::Count
            ]
        );
        assert_eq!(sort, SortOption::Time);
    }

    #[test]
    fn test_file_event_json_shape() {
        let event = FileEvent::new("/a", Operation::CREATE | Operation::WRITE, at(0, 0, 1), true);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["operation"], "CREATE|WRITE");
        assert_eq!(json["count"], 1);
        assert_eq!(json["is_dir"], true);

        let back: FileEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
