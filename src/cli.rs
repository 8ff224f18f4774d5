// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::DispatchOrder;

/// Command-line arguments for `buildplan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildplan",
    version,
    about = "Discover task dependencies from their configuration and print a dispatch plan.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build description (TOML).
    ///
    /// Default: `Buildplan.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Buildplan.toml")]
    pub config: String,

    /// Plan only this task and what it depends on. Repeatable.
    #[arg(long = "task", value_name = "NAME")]
    pub tasks: Vec<String>,

    /// Withdraw this task before dispatch; tasks depending on it are
    /// reported as blocked. Repeatable.
    #[arg(long = "skip", value_name = "NAME")]
    pub skip: Vec<String>,

    /// Dispatch order override: `first` (oldest ready task) or `last`.
    #[arg(long, value_name = "ORDER")]
    pub order: Option<DispatchOrder>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDPLAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print tasks, but don't walk or plan anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
