//! Shared types module

use std::time::SystemTime;

use crate::protocol::Outcome;

/// Per-connection metadata recorded by the acceptance pipeline
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Source address
    pub source: String,
    /// Accept timestamp
    pub timestamp: SystemTime,
    /// Protocols detected on the connection, in signature order
    pub protocols: Vec<String>,
    /// Detection outcome, if detection has run
    pub outcome: Option<Outcome>,
}

impl ConnectionInfo {
    /// Create connection info for a freshly accepted connection
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp: SystemTime::now(),
            protocols: Vec::new(),
            outcome: None,
        }
    }

    /// Record a detection outcome
    ///
    /// Matched protocols become connection metadata; every other outcome
    /// leaves the protocol list empty.
    pub fn record(&mut self, outcome: Outcome) {
        self.protocols = match &outcome {
            Outcome::Matched(protocols) => protocols.clone(),
            _ => Vec::new(),
        };
        self.outcome = Some(outcome);
    }
}
