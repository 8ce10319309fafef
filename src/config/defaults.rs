//! Default configuration values
//!
//! Single source of truth for defaults, shared by every configuration source.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::protocol::{builtin_signatures, ProtocolSignature, DEFAULT_BUFFER_CAPACITY, DEFAULT_TIMEOUT};

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "PROTOCOL_SNIFFER_";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default listen address as string
pub const LISTEN_STR: &str = "0.0.0.0:15001";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Accepted log levels
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Upper bound for the detection timeout (5 minutes)
pub const MAX_DETECTION_TIMEOUT_MS: u64 = 300_000;

/// Upper bound for the peek buffer (16 MiB)
pub const MAX_PEEK_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Default listen address
pub fn listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 15001)
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}

/// Default detection timeout in milliseconds (15 seconds)
pub fn detection_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

/// Default peek buffer size (64 KiB)
pub fn peek_buffer_size() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

/// Default upstream connection timeout in seconds
pub fn connection_timeout() -> u64 {
    30
}

/// Default signature table
pub fn signatures() -> Vec<ProtocolSignature> {
    builtin_signatures()
}
