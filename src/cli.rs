//! CLI arguments and subcommands for memchart.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format of the one-shot dump
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DumpFormat {
    Csv,
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "memchart",
    about = "Samples per-process RSS/PSS/USS and serves the snapshot as JSON or CSV",
    long_about = "Samples per-process RSS/PSS/USS and serves the snapshot as JSON or CSV.\n\n\
                  Every period memchart reads /proc/<pid>/smaps for all processes (or only the \
                  PIDS given), aggregates the mappings and publishes the result on \
                  GET / (JSON) and GET /csv. With --exit it prints one snapshot and quits.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Only sample these pids (default: every process under the proc root)
    #[arg(value_name = "PIDS")]
    pub pids: Vec<String>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Seconds between measurements
    #[arg(short = 's', long)]
    pub seconds: Option<u64>,

    /// Print CSV to stdout after every measurement
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Dump a single snapshot then exit immediately
    #[arg(short = 'e', long)]
    pub exit: bool,

    /// Output format for --exit
    #[arg(long, value_enum, default_value = "csv")]
    pub format: DumpFormat,

    /// Root of the process-information filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable /metrics endpoint
    #[arg(long)]
    pub disable_metrics: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate proc access and smaps parsing on this host
    Check {
        /// Also probe every process once and report failures
        #[arg(long)]
        all: bool,
    },
}
