//! Data forwarding module
//!
//! This module handles data forwarding between two streams.

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::common::Result;

/// Forward data between two streams until either side closes
///
/// Bytes peeked during detection are still queued on `client`, so the
/// upstream sees the connection from its first byte.
///
/// # Returns
///
/// Returns `(client_to_target, target_to_client)` byte counts.
pub async fn proxy_data<C, T>(client: &mut C, target: &mut T) -> Result<(u64, u64)>
where
    C: AsyncRead + AsyncWrite + Unpin + ?Sized,
    T: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let (to_target, to_client) = tokio::io::copy_bidirectional(client, target).await?;
    debug!(
        "Forwarding finished: {} bytes client to target, {} bytes target to client",
        to_target, to_client
    );
    Ok((to_target, to_client))
}
