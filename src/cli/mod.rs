//! CLI module for the upgrade pilot.
//!
//! This module provides the command-line interface for planning and
//! running upgrades.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use output::OutputFormatter;
