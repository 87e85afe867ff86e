// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `procpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procpipe",
    version,
    about = "Run commands and pipelines from a TOML job file, with a cap on concurrent processes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Run only the job with this name.
    #[arg(long, value_name = "NAME")]
    pub job: Option<String>,

    /// Override `[config].max_procs` (0 = available CPUs + 1).
    #[arg(long, value_name = "N")]
    pub max_procs: Option<usize>,

    /// Do not log command lines before launching them.
    #[arg(long, short)]
    pub quiet: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the jobs, but don't execute any commands.
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
