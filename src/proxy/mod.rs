//! Acceptance pipeline module
//!
//! A minimal listener that runs every inbound connection through protocol
//! detection, records the detected protocols as connection metadata and then
//! lets the connection proceed (fail-open), forwarding it upstream when a
//! target is configured.

mod forwarder;
pub mod handler;
pub mod server;

pub use forwarder::proxy_data;
pub use handler::handle_connection;
pub use server::Proxy;
