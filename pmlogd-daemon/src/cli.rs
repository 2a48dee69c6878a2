//! CLI argument definitions for pmlogd-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Pmlogd system logging daemon.
///
/// Receives syslog datagrams from local producers, classifies each
/// message against the configured rule set, and routes it to one or
/// more size-rotated log files.
#[derive(Parser, Debug)]
#[command(name = "pmlogd-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to the pmlogd.conf configuration file.
    #[arg(short, long, default_value = "/etc/pmlog/pmlogd.conf")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the RUST_LOG environment variable.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the syslog receiver bind address (e.g. 127.0.0.1:5140).
    #[arg(long)]
    pub bind: Option<String>,

    /// Override PID file path.
    #[arg(long)]
    pub pid_file: Option<PathBuf>,

    /// Validate the configuration file, print the resulting tables as
    /// JSON, and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
