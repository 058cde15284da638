//! Unified logging for debug output.
//!
//! Provides compact timestamped logging with per-module level configuration.
//! Supports `RUST_LOG` environment variable for runtime overrides.
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! default = "warn"  # quiet by default
//! file = "/tmp/treewatch.log"  # optional, stderr otherwise
//!
//! [logging.modules]
//! treewatch = "debug"
//! ```
//!
//! # Environment Variable
//!
//! `RUST_LOG` takes precedence over config:
//! ```bash
//! RUST_LOG=debug treewatch watch .
//! RUST_LOG=treewatch::watcher=trace treewatch watch src docs
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Default log file location under the user cache directory.
pub fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("treewatch").join("treewatch.log"))
}

/// Build the filter string from config: the default level followed by
/// `target=level` overrides.
fn filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.default.clone();
    for (module, level) in &config.modules {
        filter_str.push_str(&format!(",{module}={level}"));
    }
    filter_str
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize logging with configuration.
///
/// Call once at startup. Safe to call multiple times (only first call takes effect).
///
/// Log levels control visibility:
/// - `error` - errors only (quietest)
/// - `warn` - errors + warnings (default, quiet operation)
/// - `info` - normal operation logs
/// - `debug` - detailed debugging
/// - `trace` - everything
///
/// The `RUST_LOG` environment variable takes precedence over config settings.
/// When `config.file` cannot be opened, output falls back to stderr.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        // RUST_LOG env var takes precedence over config
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let mut file_error = None;
        let (writer, ansi) = match config.file.as_deref().map(open_log_file) {
            Some(Ok(file)) => (BoxMakeWriter::new(Arc::new(file)), false),
            Some(Err(e)) => {
                file_error = Some(e);
                (BoxMakeWriter::new(std::io::stderr), true)
            }
            None => (BoxMakeWriter::new(std::io::stderr), true),
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true) // Show target for filtering visibility
            .with_timer(CompactTime)
            .with_level(true)
            .with_ansi(ansi)
            .with_writer(writer)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();

        if let (Some(e), Some(path)) = (file_error, config.file.as_ref()) {
            tracing::warn!("[logging] cannot open {}: {e}", path.display());
        }
    });
}

/// Initialize logging with default configuration.
///
/// Uses `LoggingConfig::default()` which sets `default = "warn"` for quiet operation.
/// Use `RUST_LOG=debug` environment variable for verbose output.
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Log an event with component context.
///
/// # Examples
/// ```ignore
/// log_event!("watcher", "root added", "{}", path.display());
/// log_event!("monitor", "stopped");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-only event logging.
///
/// # Examples
/// ```ignore
/// debug_event!("watcher", "subscription opened");
/// ```
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
