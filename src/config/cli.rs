//! Command line arguments

use clap::Parser;
use std::path::PathBuf;

/// Connection-level protocol sniffer
///
/// Every option overrides the same setting from the configuration file and
/// from `PROTOCOL_SNIFFER_*` environment variables.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "protocol-sniffer", version, about, long_about = None)]
pub struct CliArgs {
    /// Listen address
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Forward connections to this address after detection
    #[arg(short, long)]
    pub target: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Protocol detection timeout in milliseconds
    #[arg(long)]
    pub detection_timeout_ms: Option<u64>,

    /// Peek buffer size in bytes
    #[arg(long)]
    pub peek_buffer_size: Option<usize>,

    /// Upstream connect timeout in seconds
    #[arg(long)]
    pub connection_timeout: Option<u64>,

    /// Load configuration from a JSON file
    #[arg(short, long, env = "PROTOCOL_SNIFFER_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}
