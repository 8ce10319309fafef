//! Protocol Sniffer command line tool
//!
//! Listens for connections, detects their protocol and forwards them to the
//! configured target.

use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use protocol_sniffer::common::{init_logger, Result};
use protocol_sniffer::config::{self, CliArgs};
use protocol_sniffer::{Proxy, APP_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // The logger is configured from the loaded settings, so a broken
    // configuration is reported on stderr directly.
    let config = match config::auto_load(args) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    init_logger(config.log_level());

    info!("Starting {} v{}", APP_NAME, VERSION);
    info!("Listen address: {}", config.listen());
    info!(
        "Detection timeout: {} ms, peek buffer: {} bytes, {} signatures",
        config.detection_timeout_ms(),
        config.peek_buffer_size(),
        config.signatures().len()
    );

    let proxy = Proxy::new(Arc::clone(&config))?;

    info!("Protocol sniffer ready, press Ctrl+C to stop");

    proxy
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Protocol sniffer stopped");
    Ok(())
}
