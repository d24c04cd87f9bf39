// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dagrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagrun",
    version,
    about = "Execute a DAG of commands with a bounded worker pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Dagrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Dagrun.toml")]
    pub config: String,

    /// Run only the named nodes (repeatable). Defaults to every node.
    ///
    /// Dependencies outside the selected set are treated as satisfied.
    #[arg(long = "select", value_name = "NAME")]
    pub select: Vec<String>,

    /// Worker pool size, overriding `[run].threads` from the config.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Abort the run on the first node error or failed check.
    #[arg(long)]
    pub fail_fast: bool,

    /// Execute nodes inline on the driver task instead of the pool.
    ///
    /// Intended for profiling; scheduling decisions are identical, only
    /// the execution overlap disappears.
    #[arg(long)]
    pub single_threaded: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't execute any commands.
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
