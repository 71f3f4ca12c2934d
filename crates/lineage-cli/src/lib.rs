//! Lineage CLI library.
//!
//! Configuration loading, command execution and output formatting for the
//! `lineage` command-line tool.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod notifier;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use notifier::LogNotifier;
pub use output::Formatter;
