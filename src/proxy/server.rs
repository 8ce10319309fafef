//! Listener module
//!
//! Accepts connections and runs each one through protocol detection on its
//! own task.

use log::{debug, error, info};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::common::{ConnectionInfo, Result};
use crate::config::SnifferConfig;
use crate::protocol::Sniffer;
use super::handler::handle_connection;

/// Sniffing listener
///
/// Every accepted connection is sniffed, then forwarded to the configured
/// target (or closed when there is none).
pub struct Proxy {
    listen_addr: SocketAddr,
    target_addr: Option<SocketAddr>,
    connect_timeout: Duration,
    sniffer: Sniffer,
}

impl Proxy {
    /// Create a listener from validated configuration
    pub fn new(config: Arc<SnifferConfig>) -> Result<Self> {
        Ok(Self {
            listen_addr: config.listen(),
            target_addr: config.target(),
            connect_timeout: Duration::from_secs(config.connection_timeout()),
            sniffer: Sniffer::from_config(&config)?,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Bind and serve until an I/O error occurs on the listener
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Bind and serve until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.listen_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener until `shutdown` completes
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Protocol sniffer listening on {}", listener.local_addr()?);
        match self.target_addr {
            Some(target) => info!("Forwarding to {}", target),
            None => info!("No target configured; connections are closed after detection"),
        }

        let mut tasks: JoinSet<Result<ConnectionInfo>> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((client_stream, client_addr)) => {
                            debug!("Accepted connection from {}", client_addr);
                            let info = ConnectionInfo::new(client_addr.to_string());
                            let sniffer = self.sniffer.clone();
                            let target_addr = self.target_addr;
                            let connect_timeout = self.connect_timeout;

                            tasks.spawn(async move {
                                handle_connection(client_stream, info, &sniffer, target_addr, connect_timeout).await
                            });
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                        }
                    }
                }

                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    match result {
                        Ok(Ok(info)) => debug!("Connection from {} finished", info.source),
                        Ok(Err(e)) => error!("Connection error: {}", e),
                        Err(e) => error!("Task error: {}", e),
                    }
                }

                () = &mut shutdown => {
                    info!("Shutting down, aborting {} connections", tasks.len());
                    break;
                }
            }
        }

        tasks.shutdown().await;
        Ok(())
    }
}
