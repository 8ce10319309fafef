//! Configuration validator
//!
//! This module provides functionality for validating configuration.

use crate::config::defaults::{LOG_LEVELS, MAX_DETECTION_TIMEOUT_MS, MAX_PEEK_BUFFER_SIZE};
use crate::config::error::{ConfigError, Result};
use crate::config::types::SnifferConfig;

/// Validate the configuration
pub fn validate_config(config: &SnifferConfig) -> Result<()> {
    validate_network_settings(config)?;
    validate_detection_settings(config)?;
    validate_general_settings(config)?;
    Ok(())
}

/// Validate network settings
fn validate_network_settings(config: &SnifferConfig) -> Result<()> {
    if config.target() == Some(config.listen()) {
        return Err(ConfigError::InvalidCombination(format!(
            "listen and target addresses are both {}",
            config.listen()
        )));
    }

    if config.connection_timeout() == 0 {
        return Err(ConfigError::InvalidValue(
            "connection_timeout".to_string(),
            "must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate detection timeout, buffer size and signatures
fn validate_detection_settings(config: &SnifferConfig) -> Result<()> {
    let timeout = config.detection_timeout_ms();
    if timeout == 0 || timeout > MAX_DETECTION_TIMEOUT_MS {
        return Err(ConfigError::InvalidValue(
            "detection_timeout_ms".to_string(),
            format!("{} is outside 1..={}", timeout, MAX_DETECTION_TIMEOUT_MS),
        ));
    }

    let size = config.peek_buffer_size();
    if size == 0 || size > MAX_PEEK_BUFFER_SIZE {
        return Err(ConfigError::InvalidValue(
            "peek_buffer_size".to_string(),
            format!("{} is outside 1..={}", size, MAX_PEEK_BUFFER_SIZE),
        ));
    }

    config.signature_table()?;
    Ok(())
}

/// Validate general settings
fn validate_general_settings(config: &SnifferConfig) -> Result<()> {
    let level = config.log_level().to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::InvalidValue(
            "log_level".to_string(),
            format!("{} (expected one of {})", config.log_level(), LOG_LEVELS.join(", ")),
        ));
    }
    Ok(())
}
