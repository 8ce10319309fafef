//! Configuration types
//!
//! This module contains the main configuration types used throughout the application.

use log::debug;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::parse_socket_addr;
use crate::config::defaults;
use crate::config::error::Result;
use crate::protocol::{ProtocolSignature, SignatureTable, SniffSettings};

/// Source of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSource {
    /// Default value
    Default,
    /// From configuration file
    File,
    /// From environment variable
    Environment,
    /// From command line argument
    CommandLine,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Default => write!(f, "default"),
            ValueSource::File => write!(f, "file"),
            ValueSource::Environment => write!(f, "environment"),
            ValueSource::CommandLine => write!(f, "command line"),
        }
    }
}

/// Custom deserializer for socket addresses that also accepts host names
fn deserialize_socket_addr<'de, D>(deserializer: D) -> std::result::Result<Option<SocketAddr>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(addr_str) => parse_socket_addr(&addr_str)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Configuration values
///
/// Every field is optional so that sources can be layered: a source only
/// overrides the fields it actually sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigValues {
    /// Listen address (host:port)
    #[serde(default, deserialize_with = "deserialize_socket_addr")]
    pub listen: Option<SocketAddr>,

    /// Upstream address connections are forwarded to after detection
    #[serde(default, deserialize_with = "deserialize_socket_addr")]
    pub target: Option<SocketAddr>,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default)]
    pub log_level: Option<String>,

    /// How long protocol detection may take, in milliseconds
    #[serde(default)]
    pub detection_timeout_ms: Option<u64>,

    /// Capacity of each session's peek buffer, in bytes
    #[serde(default)]
    pub peek_buffer_size: Option<usize>,

    /// Upstream connect timeout in seconds
    #[serde(default)]
    pub connection_timeout: Option<u64>,

    /// Protocol signatures, in detection order
    #[serde(default)]
    pub signatures: Option<Vec<ProtocolSignature>>,
}

/// Sniffer configuration
///
/// Holds the layered values together with where each value came from.
#[derive(Debug, Clone, Default)]
pub struct SnifferConfig {
    /// Configuration values
    pub values: ConfigValues,
    /// Configuration file the values were loaded from, if any
    pub config_file: Option<PathBuf>,
    /// Source of each explicitly set field
    pub sources: HashMap<String, ValueSource>,
}

macro_rules! merge_field {
    ($self:ident, $other:ident, $source:ident, $($field:ident),+) => {
        $(
            if $other.values.$field.is_some() {
                $self.values.$field = $other.values.$field.clone();
                $self.sources.insert(stringify!($field).to_string(), $source);
            }
        )+
    };
}

impl SnifferConfig {
    /// Create a configuration from explicit values
    pub fn from_values(values: ConfigValues, source: ValueSource) -> Self {
        let mut config = Self::default();
        let other = Self {
            values,
            config_file: None,
            sources: HashMap::new(),
        };
        config.merge_from(&other, source);
        config
    }

    /// Merge `other` on top of this configuration
    ///
    /// Fields set in `other` win and are attributed to `source`.
    pub fn merge(mut self, other: &SnifferConfig, source: ValueSource) -> Self {
        self.merge_from(other, source);
        if other.config_file.is_some() {
            self.config_file = other.config_file.clone();
        }
        self
    }

    fn merge_from(&mut self, other: &SnifferConfig, source: ValueSource) {
        merge_field!(
            self, other, source,
            listen, target, log_level, detection_timeout_ms,
            peek_buffer_size, connection_timeout, signatures
        );
    }

    /// Fill every unset field with its default
    pub fn set_default_values(&mut self) {
        let values = &mut self.values;
        let sources = &mut self.sources;
        let mut fill = |name: &str, missing: bool| {
            if missing {
                sources.insert(name.to_string(), ValueSource::Default);
            }
        };

        fill("listen", values.listen.is_none());
        values.listen.get_or_insert_with(defaults::listen);
        fill("log_level", values.log_level.is_none());
        values.log_level.get_or_insert_with(defaults::log_level);
        fill("detection_timeout_ms", values.detection_timeout_ms.is_none());
        values.detection_timeout_ms.get_or_insert_with(defaults::detection_timeout_ms);
        fill("peek_buffer_size", values.peek_buffer_size.is_none());
        values.peek_buffer_size.get_or_insert_with(defaults::peek_buffer_size);
        fill("connection_timeout", values.connection_timeout.is_none());
        values.connection_timeout.get_or_insert_with(defaults::connection_timeout);
        fill("signatures", values.signatures.is_none());
        values.signatures.get_or_insert_with(defaults::signatures);
    }

    /// Source of a field's value; unset fields report `Default`
    pub fn source_of(&self, field: &str) -> ValueSource {
        self.sources.get(field).copied().unwrap_or(ValueSource::Default)
    }

    pub fn listen(&self) -> SocketAddr {
        self.values.listen.unwrap_or_else(defaults::listen)
    }

    /// Forward destination; `None` means connections are closed after detection
    pub fn target(&self) -> Option<SocketAddr> {
        self.values.target
    }

    pub fn log_level(&self) -> &str {
        self.values.log_level.as_deref().unwrap_or(defaults::LOG_LEVEL_STR)
    }

    pub fn detection_timeout_ms(&self) -> u64 {
        self.values.detection_timeout_ms.unwrap_or_else(defaults::detection_timeout_ms)
    }

    pub fn peek_buffer_size(&self) -> usize {
        self.values.peek_buffer_size.unwrap_or_else(defaults::peek_buffer_size)
    }

    pub fn connection_timeout(&self) -> u64 {
        self.values.connection_timeout.unwrap_or_else(defaults::connection_timeout)
    }

    /// Signatures in detection order
    pub fn signatures(&self) -> Vec<ProtocolSignature> {
        self.values.signatures.clone().unwrap_or_else(defaults::signatures)
    }

    /// Build the signature table detection runs against
    pub fn signature_table(&self) -> Result<SignatureTable> {
        SignatureTable::new(self.signatures())
    }

    /// Detection parameters for sessions
    pub fn sniff_settings(&self) -> SniffSettings {
        SniffSettings {
            timeout: Duration::from_millis(self.detection_timeout_ms()),
            buffer_capacity: self.peek_buffer_size(),
        }
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Log the effective configuration at debug level
    pub fn log(&self) {
        debug!("  listen: {} ({})", self.listen(), self.source_of("listen"));
        match self.target() {
            Some(target) => debug!("  target: {} ({})", target, self.source_of("target")),
            None => debug!("  target: none"),
        }
        debug!("  log_level: {} ({})", self.log_level(), self.source_of("log_level"));
        debug!(
            "  detection_timeout_ms: {} ({})",
            self.detection_timeout_ms(),
            self.source_of("detection_timeout_ms")
        );
        debug!(
            "  peek_buffer_size: {} ({})",
            self.peek_buffer_size(),
            self.source_of("peek_buffer_size")
        );
        debug!(
            "  connection_timeout: {} ({})",
            self.connection_timeout(),
            self.source_of("connection_timeout")
        );
        for signature in self.signatures() {
            debug!("  signature: {} <- {}", signature.identifier, signature.token);
        }
    }
}
