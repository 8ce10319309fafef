//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use thiserror::Error;
use std::io;

/// Protocol sniffer error type
#[derive(Error, Debug)]
pub enum SnifferError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Readiness or timer registration failed
    ///
    /// Raised synchronously by session start; never delivered through the
    /// completion callback.
    #[error("Registration error: {0}")]
    Registration(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `SnifferError`.
pub type Result<T> = std::result::Result<T, SnifferError>;
