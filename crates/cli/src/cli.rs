//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Switchyard - send one request to many backends, get the best answer back
#[derive(Parser, Debug)]
#[command(
    name = "switchyard",
    author,
    version,
    about = "Protocol-agnostic eager request dispatcher",
    long_about = "Sends one logical request concurrently to every configured route \n\
                  (HTTP or RPC), each with its own timeout, and returns the response \n\
                  of the highest-ranked route that succeeded."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SWITCHYARD_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SWITCHYARD_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch a request through the configured routes
    Dispatch(DispatchArgs),

    /// Validate configuration file without dispatching
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `dispatch` command
#[derive(Parser, Debug, Clone)]
pub struct DispatchArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "switchyard.toml", env = "SWITCHYARD_CONFIG")]
    pub config: PathBuf,

    /// Request payload
    #[arg(short, long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the request payload from a file
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Request metadata as key=value (repeatable)
    #[arg(short = 'H', long = "header", value_name = "KEY=VALUE")]
    pub headers: Vec<String>,

    /// Overall deadline in milliseconds (0 = route timeouts only)
    #[arg(long, default_value = "0", env = "SWITCHYARD_DEADLINE_MS")]
    pub deadline_ms: u64,

    /// Number of times to send the request
    #[arg(long, default_value = "1")]
    pub repeat: u32,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SWITCHYARD_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "switchyard.toml", env = "SWITCHYARD_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml", env = "SWITCHYARD_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
