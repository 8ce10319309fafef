//! Protocol Sniffer: connection-level application protocol detection
//!
//! This library inspects the first bytes of an inbound connection, before the
//! application has read anything, and decides which application protocol is
//! being spoken. Bytes are only ever peeked, so the next stage of the pipeline
//! still reads the connection from its first byte.
//!
//! # Main Features
//!
//! - Case-insensitive, word-delimited signature matching (`HTTP/1.1`, `HTTP/2.0`, or custom tokens)
//! - A per-connection state machine that decides exactly once
//! - Bounded detection time and buffer size, failing open on either limit
//! - A tokio driver using real non-destructive socket peeks
//!
//! # Example
//!
//! ```no_run
//! use protocol_sniffer::{Outcome, Result, Sniffer};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:15001").await?;
//!     let sniffer = Sniffer::default();
//!
//!     let (stream, peer) = listener.accept().await?;
//!     match sniffer.sniff(&stream).await? {
//!         Outcome::Matched(protocols) => println!("{} speaks {:?}", peer, protocols),
//!         other => println!("{}: {}", peer, other),
//!     }
//!     // `stream` still holds every byte the client sent
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod protocol;
pub mod proxy;

// Re-export commonly used structures and functions for convenience
pub use common::{parse_socket_addr, ConnectionInfo, Result, SnifferError};
pub use config::SnifferConfig;
pub use protocol::{
    FailureReason, Outcome, ProtocolSignature, SignatureTable, SniffSession, SniffSettings, Sniffer,
};
pub use proxy::Proxy;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
