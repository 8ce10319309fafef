//! Configuration sources
//!
//! This module defines traits and implementations for loading configuration
//! from different sources.

use log::{debug, warn};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::parse_socket_addr;
use crate::config::cli::CliArgs;
use crate::config::error::{ConfigError, Result};
use crate::config::types::{ConfigValues, SnifferConfig, ValueSource};

/// Configuration source trait
pub trait ConfigSource {
    /// Load configuration from this source
    fn load(&self) -> Result<SnifferConfig>;

    /// Get the source type
    fn source_type(&self) -> ValueSource;
}

/// Default configuration source
pub struct DefaultSource;

impl ConfigSource for DefaultSource {
    fn load(&self) -> Result<SnifferConfig> {
        debug!("Loading default configuration");
        let mut config = SnifferConfig::default();
        config.set_default_values();
        Ok(config)
    }

    fn source_type(&self) -> ValueSource {
        ValueSource::Default
    }
}

/// JSON file configuration source
pub struct FileSource {
    pub path: PathBuf,
    /// Whether a missing file is an error rather than an empty source
    pub required: bool,
}

impl FileSource {
    /// Create a source for a file that must exist
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required: true,
        }
    }

    /// Create a source for a file that is skipped when absent
    pub fn optional<P: AsRef<Path>>(path: P) -> Self {
        Self {
            required: false,
            ..Self::new(path)
        }
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<SnifferConfig> {
        debug!("Loading configuration from file: {}", self.path.display());

        if !self.path.exists() {
            if self.required {
                return Err(ConfigError::FileNotFound(self.path.clone()));
            }
            debug!("Optional configuration file not found: {}", self.path.display());
            return Ok(SnifferConfig::default());
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::FileReadError(self.path.clone(), e.to_string()))?;

        let values: ConfigValues = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", self.path.display(), e)))?;

        let mut config = SnifferConfig::from_values(values, self.source_type());
        config.config_file = Some(self.path.clone());
        Ok(config)
    }

    fn source_type(&self) -> ValueSource {
        ValueSource::File
    }
}

/// Environment variable configuration source
///
/// Reads `<prefix>LISTEN`, `<prefix>TARGET`, `<prefix>LOG_LEVEL`,
/// `<prefix>DETECTION_TIMEOUT_MS`, `<prefix>PEEK_BUFFER_SIZE` and
/// `<prefix>CONNECTION_TIMEOUT`. Unparseable values are skipped with a warning.
pub struct EnvSource {
    pub prefix: String,
}

impl EnvSource {
    /// Create a new environment source
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        let full_name = format!("{}{}", self.prefix, name);
        let value = env::var(&full_name).ok()?;
        debug!("Found environment variable {}={}", full_name, value);
        Some(value)
    }

    fn parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        let value = self.var(name)?;
        match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                warn!("Invalid {}{} in environment: {}", self.prefix, name, value);
                None
            }
        }
    }

    fn address(&self, name: &str) -> Option<std::net::SocketAddr> {
        let value = self.var(name)?;
        match parse_socket_addr(&value) {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!("Invalid {}{} in environment: {}", self.prefix, name, e);
                None
            }
        }
    }
}

impl ConfigSource for EnvSource {
    fn load(&self) -> Result<SnifferConfig> {
        debug!("Loading configuration from environment variables with prefix: {}", self.prefix);

        let values = ConfigValues {
            listen: self.address("LISTEN"),
            target: self.address("TARGET"),
            log_level: self.var("LOG_LEVEL"),
            detection_timeout_ms: self.parsed("DETECTION_TIMEOUT_MS"),
            peek_buffer_size: self.parsed("PEEK_BUFFER_SIZE"),
            connection_timeout: self.parsed("CONNECTION_TIMEOUT"),
            signatures: None,
        };

        Ok(SnifferConfig::from_values(values, self.source_type()))
    }

    fn source_type(&self) -> ValueSource {
        ValueSource::Environment
    }
}

/// Command line argument configuration source
pub struct CliSource {
    pub args: CliArgs,
}

impl CliSource {
    /// Create a new command line source
    pub fn new(args: CliArgs) -> Self {
        Self { args }
    }
}

impl ConfigSource for CliSource {
    fn load(&self) -> Result<SnifferConfig> {
        debug!("Loading configuration from command line arguments");

        let address = |name: &str, value: &Option<String>| -> Result<Option<std::net::SocketAddr>> {
            value
                .as_deref()
                .map(|addr| {
                    parse_socket_addr(addr)
                        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
                })
                .transpose()
        };

        let values = ConfigValues {
            listen: address("listen", &self.args.listen)?,
            target: address("target", &self.args.target)?,
            log_level: self.args.log_level.clone(),
            detection_timeout_ms: self.args.detection_timeout_ms,
            peek_buffer_size: self.args.peek_buffer_size,
            connection_timeout: self.args.connection_timeout,
            signatures: None,
        };

        Ok(SnifferConfig::from_values(values, self.source_type()))
    }

    fn source_type(&self) -> ValueSource {
        ValueSource::CommandLine
    }
}
