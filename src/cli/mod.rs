//! CLI module for treewatch.
//!
//! Provides command-line interface parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
