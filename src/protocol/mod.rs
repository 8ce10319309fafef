//! Protocol detection module
//!
//! This module detects the application protocol of an inbound connection by
//! peeking its first bytes, without consuming them and without blocking the
//! task that owns the connection.
//!
//! - [`signature`] matches peeked bytes against known protocol tokens.
//! - [`session`] is the per-connection state machine that decides exactly once.
//! - [`event`] defines the socket and event-loop seams the session relies on.
//! - [`driver`] runs sessions on the tokio runtime.

pub mod buffer;
pub mod driver;
pub mod event;
pub mod session;
pub mod signature;

pub use buffer::PeekBuffer;
pub use driver::Sniffer;
pub use event::{EventLoop, PeekSocket, Registration, SessionEvent};
pub use session::{
    FailureReason, Outcome, ReadProgress, SessionState, SniffSession, SniffSettings,
    DEFAULT_BUFFER_CAPACITY, DEFAULT_TIMEOUT,
};
pub use signature::{builtin_signatures, ProtocolSignature, SignatureTable, DELIMITERS};
