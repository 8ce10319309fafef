//! Network helpers

use socket2::SockRef;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use tokio::net::TcpStream;

use super::error::{SnifferError, Result};

/// Resolve `ip:port` or `host:port` to the first address it names
pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        return Ok(socket_addr);
    }

    addr.to_socket_addrs()
        .map_err(|e| SnifferError::Config(format!("Failed to parse address {}: {}", addr, e)))?
        .next()
        .ok_or_else(|| SnifferError::Config(format!("Address {} resolved to nothing", addr)))
}

/// Register a second handle to the same socket with the reactor
///
/// The duplicate has its own readiness state. Clearing it (by reporting
/// would-block from `try_io`) leaves the readiness of `stream` untouched, so
/// bytes that were only peeked stay visible to the next reader of `stream`.
///
/// Must be called from within a tokio runtime.
pub fn duplicate_stream(stream: &TcpStream) -> io::Result<TcpStream> {
    let socket = SockRef::from(stream).try_clone()?;
    let std_stream: std::net::TcpStream = socket.into();
    std_stream.set_nonblocking(true)?;
    TcpStream::from_std(std_stream)
}
