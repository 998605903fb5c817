// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `shellwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "shellwatch",
    version,
    about = "Run task chains when watched files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Relative patterns and task commands are interpreted against the
    /// directory containing this file.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Run every watch entry's task chain once, in file order, then exit.
    #[arg(long, conflicts_with = "task")]
    pub once: bool,

    /// Run a single task and exit.
    #[arg(long, value_name = "NAME")]
    pub task: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SHELLWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the config and the files each watch entry
    /// resolves to, but don't execute any commands.
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
