//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::types::SortOption;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Recursive directory watcher
#[derive(Parser, Debug)]
#[command(
    name = "treewatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch directory trees and log their changes",
    long_about = "Watch one or more directory trees recursively and print an aggregated, \
                  filterable log of filesystem changes.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Append logs to a file (defaults to the user cache directory)
    #[arg(long, global = true, num_args = 0..=1, value_name = "FILE")]
    pub log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Create .treewatch/settings.toml with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Watch directories and print changes as they happen
    #[command(about = "Watch directory trees and print each change")]
    Watch {
        /// Directories to watch (defaults to watch.roots, then the current directory)
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Log every notification individually
        #[arg(long)]
        no_aggregate: bool,

        /// Capacity of the event log (overrides config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        max_events: Option<u64>,

        /// Stop after this many seconds
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,

        /// Write the event log as JSON on exit (directory or file)
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,

        /// Always rebuild the subscription when a root is removed
        #[arg(long)]
        rebuild_on_remove: bool,
    },

    /// Print a previously exported event log
    #[command(about = "Show a JSON export, filtered and sorted")]
    Show {
        /// Export file (defaults to the newest export in the current directory)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Only entries whose path contains this text (case-insensitive)
        #[arg(long)]
        path: Option<String>,

        /// Only entries with exactly this operation, e.g. WRITE or CREATE|WRITE
        #[arg(long = "op", value_name = "OPERATION")]
        operation: Option<String>,

        /// Hide directories
        #[arg(long)]
        no_dirs: bool,

        /// Hide files
        #[arg(long)]
        no_files: bool,

        /// Sort order (overrides config)
        #[arg(long, value_enum)]
        sort: Option<SortOption>,

        /// Expand aggregated entries into individual ones
        #[arg(long)]
        expand: bool,
    },

    /// Show current configuration
    #[command(about = "Display active settings")]
    Config,
}
