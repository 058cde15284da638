//! Configuration for the watcher and the event log.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the commands)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TW_` and use double underscores
//! to separate nested levels:
//! - `TW_EVENTS__MAX_EVENTS=500` sets `events.max_events`
//! - `TW_EVENTS__AGGREGATE=false` sets `events.aggregate`
//! - `TW_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::events::DEFAULT_MAX_EVENTS;
use crate::types::SortOption;

/// Directory holding the settings file, searched for from the current
/// directory upwards.
pub const CONFIG_DIR: &str = ".treewatch";
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Watch manager settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Event log settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct WatchConfig {
    /// Roots watched when none are given on the command line
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    /// Rebuild the whole subscription on every root removal
    #[serde(default)]
    pub rebuild_on_remove: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventsConfig {
    /// Capacity of the event log
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    /// Start with aggregation enabled
    #[serde(default = "default_true")]
    pub aggregate: bool,

    /// Initial sort order
    #[serde(default)]
    pub sort: SortOption,

    #[serde(default = "default_true")]
    pub show_dirs: bool,

    #[serde(default = "default_true")]
    pub show_files: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Append logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Per-target level overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchConfig::default(),
            events: EventsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            aggregate: true,
            sort: SortOption::default(),
            show_dirs: true,
            show_files: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            file: None,
            modules: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref())
            .extract()
            .map_err(Box::new)
            .and_then(Self::validate)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path))
            // Use double underscore (__) to separate nested levels
            // Single underscore (_) remains as is within field names
            .merge(Env::prefixed("TW_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    fn validate(settings: Settings) -> Result<Settings, Box<figment::Error>> {
        if settings.events.max_events == 0 {
            return Err(Box::new(figment::Error::from(
                "events.max_events must be at least 1".to_string(),
            )));
        }
        Ok(settings)
    }

    /// Find the settings file by looking for the config directory
    /// from the current directory up to the filesystem root
    pub fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(Path::new("."), force)
    }

    pub fn init_config_file_in(
        dir: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
