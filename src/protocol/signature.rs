//! Protocol signature matching
//!
//! A signature is a short token whose presence as a delimited word in the
//! first bytes of a connection is taken as evidence of an application
//! protocol. Matching is a pure function of the bytes and the table, so it is
//! safe to run again on every growing prefix of the same stream.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ConfigError;

/// Bytes that separate candidate tokens
pub const DELIMITERS: &[u8] = b" \n";

/// A protocol identifier and the token that reveals it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolSignature {
    /// Identifier reported on a match (e.g. `http/1.1`)
    pub identifier: String,
    /// Token searched for in the peeked bytes (e.g. `HTTP/1.1`)
    pub token: String,
}

impl ProtocolSignature {
    /// Create a new signature
    pub fn new(identifier: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            token: token.into(),
        }
    }

    /// Check whether this signature's token appears as a delimited word in `bytes`
    pub fn matches(&self, bytes: &[u8]) -> bool {
        let token = self.token.as_bytes();
        bytes
            .split(|b| DELIMITERS.contains(b))
            .map(<[u8]>::trim_ascii)
            .any(|word| word.eq_ignore_ascii_case(token))
    }
}

/// Built-in signatures, in detection order
pub fn builtin_signatures() -> Vec<ProtocolSignature> {
    vec![
        ProtocolSignature::new("http/1.1", "HTTP/1.1"),
        ProtocolSignature::new("http/2", "HTTP/2.0"),
    ]
}

/// Ordered, immutable set of protocol signatures
///
/// Built once when configuration is loaded and then shared read-only
/// between sessions behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureTable {
    signatures: Vec<ProtocolSignature>,
}

impl SignatureTable {
    /// Build a table, rejecting signatures that could never match
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty identifier or token, a
    /// token containing a delimiter or whitespace, or a duplicate identifier.
    pub fn new(signatures: Vec<ProtocolSignature>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();

        for signature in &signatures {
            if signature.identifier.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "signatures".to_string(),
                    "signature identifier must not be empty".to_string(),
                ));
            }

            if signature.token.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "signatures".to_string(),
                    format!("token for '{}' must not be empty", signature.identifier),
                ));
            }

            if signature.token.bytes().any(|b| b.is_ascii_whitespace()) {
                return Err(ConfigError::InvalidValue(
                    "signatures".to_string(),
                    format!(
                        "token '{}' for '{}' contains whitespace and can never match",
                        signature.token, signature.identifier
                    ),
                ));
            }

            if !seen.insert(signature.identifier.as_str()) {
                return Err(ConfigError::InvalidValue(
                    "signatures".to_string(),
                    format!("duplicate signature identifier '{}'", signature.identifier),
                ));
            }
        }

        Ok(Self { signatures })
    }

    /// Detect protocols present in `bytes`
    ///
    /// Identifiers are returned in registration order. An empty slice yields
    /// an empty result.
    pub fn detect(&self, bytes: &[u8]) -> Vec<&str> {
        if bytes.is_empty() {
            return Vec::new();
        }

        self.signatures
            .iter()
            .filter(|signature| signature.matches(bytes))
            .map(|signature| signature.identifier.as_str())
            .collect()
    }

    /// Signatures in registration order
    pub fn signatures(&self) -> &[ProtocolSignature] {
        &self.signatures
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self {
            signatures: builtin_signatures(),
        }
    }
}
