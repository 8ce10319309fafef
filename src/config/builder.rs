//! Configuration builder
//!
//! This module provides a builder pattern for constructing configuration.

use log::debug;
use std::path::Path;

use crate::config::cli::CliArgs;
use crate::config::defaults::{DEFAULT_CONFIG_FILE, ENV_PREFIX};
use crate::config::error::Result;
use crate::config::source::{CliSource, ConfigSource, DefaultSource, EnvSource, FileSource};
use crate::config::types::SnifferConfig;
use crate::config::validator::validate_config;

/// Configuration builder
///
/// Provides a fluent API for building configuration from multiple sources.
/// Sources are applied in the order they are added, later ones winning.
pub struct ConfigBuilder {
    sources: Vec<Box<dyn ConfigSource>>,
    validate: bool,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            validate: true,
        }
    }

    /// Add default source
    pub fn with_defaults(mut self) -> Self {
        debug!("Adding default configuration source");
        self.sources.push(Box::new(DefaultSource));
        self
    }

    /// Add file source; building fails if the file does not exist
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        debug!("Adding file configuration source: {}", path.display());
        self.sources.push(Box::new(FileSource::new(path)));
        self
    }

    /// Add file source that is skipped when the file does not exist
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        debug!("Adding optional file configuration source: {}", path.display());
        self.sources.push(Box::new(FileSource::optional(path)));
        self
    }

    /// Add environment source
    pub fn with_env(mut self, prefix: &str) -> Self {
        debug!("Adding environment configuration source with prefix: {}", prefix);
        self.sources.push(Box::new(EnvSource::new(prefix)));
        self
    }

    /// Add command line source
    pub fn with_cli(mut self, args: CliArgs) -> Self {
        debug!("Adding command line configuration source");
        self.sources.push(Box::new(CliSource::new(args)));
        self
    }

    /// Disable validation
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SnifferConfig> {
        let mut config = SnifferConfig::default();

        debug!("Building configuration from {} sources", self.sources.len());

        for source in self.sources {
            let source_type = source.source_type();
            debug!("Loading configuration from source: {}", source_type);
            let source_config = source.load()?;
            config = config.merge(&source_config, source_type);
        }

        config.set_default_values();

        if self.validate {
            debug!("Validating configuration");
            validate_config(&config)?;
        }

        debug!("Final configuration:");
        config.log();

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
            .with_defaults()
            .with_optional_file(DEFAULT_CONFIG_FILE)
            .with_env(ENV_PREFIX)
    }
}

/// Load configuration with proper priority
///
/// 1. Default values (lowest priority)
/// 2. Configuration file: `--config-file` must exist, the implicit
///    `config.json` is used only if present
/// 3. Environment variables
/// 4. Command line arguments (highest priority)
pub fn auto_load(args: CliArgs) -> Result<SnifferConfig> {
    let builder = ConfigBuilder::new().with_defaults();

    let builder = match args.config_file.clone() {
        Some(path) => builder.with_file(path),
        None => builder.with_optional_file(DEFAULT_CONFIG_FILE),
    };

    builder.with_env(ENV_PREFIX).with_cli(args).build()
}
