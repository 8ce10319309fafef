//! Connection handler module
//!
//! Runs protocol detection on one accepted connection, records the result
//! and then lets the connection proceed whatever the outcome.

use log::{debug, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::common::{ConnectionInfo, SnifferError, Result};
use crate::protocol::Sniffer;
use super::forwarder::proxy_data;

/// Handle a single client connection
///
/// # Parameters
///
/// * `client_stream` - Accepted client stream
/// * `info` - Connection metadata; detected protocols are recorded here
/// * `sniffer` - Protocol sniffer
/// * `target_addr` - Upstream to forward to, if any
/// * `connect_timeout` - Upstream connect timeout
///
/// # Returns
///
/// Returns the connection info with the detection outcome recorded.
pub async fn handle_connection(
    mut client_stream: TcpStream,
    mut info: ConnectionInfo,
    sniffer: &Sniffer,
    target_addr: Option<SocketAddr>,
    connect_timeout: Duration,
) -> Result<ConnectionInfo> {
    // Only registration failures surface as errors; everything else is an outcome.
    let outcome = sniffer.sniff(&client_stream).await?;

    let elapsed = info.timestamp.elapsed().unwrap_or_default();
    if outcome.is_matched() {
        info!(
            "{}: detected {} in {} ms",
            info.source,
            outcome.protocols().join(", "),
            elapsed.as_millis()
        );
    } else {
        debug!("{}: protocol not detected ({}) after {} ms", info.source, outcome, elapsed.as_millis());
    }
    info.record(outcome);

    let Some(target_addr) = target_addr else {
        debug!("{}: no target configured, closing", info.source);
        return Ok(info);
    };

    let mut target_stream = timeout(connect_timeout, TcpStream::connect(target_addr))
        .await
        .map_err(|_| SnifferError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "Connection timed out")))?
        .map_err(|e| {
            warn!("{}: failed to connect to {}: {}", info.source, target_addr, e);
            SnifferError::Io(e)
        })?;

    proxy_data(&mut client_stream, &mut target_stream).await?;
    Ok(info)
}
