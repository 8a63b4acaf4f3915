//! Payment verifier service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                  PAYMENT VERIFIER                    │
//!                 │                                                      │
//!  Storefront     │  ┌──────────┐   ┌──────────────┐   ┌─────────────┐  │
//!  ───────────────┼─▶│  http    │──▶│ verification │──▶│ blockchain  │──┼──▶ Block
//!                 │  │ session  │   │   tracker    │   │  explorer   │  │    explorer
//!  ◀──────────────┼──│   API    │◀──│  + sessions  │◀──│   client    │◀─┼──── API
//!                 │  └──────────┘   └──────────────┘   └─────────────┘  │
//!                 │                                                      │
//!                 │  config (hot reload) · observability · lifecycle     │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use payment_verifier::config::{load_config, watcher::ConfigWatcher, VerifierConfig};
use payment_verifier::lifecycle::{signals, Shutdown};
use payment_verifier::observability::{logging, metrics};
use payment_verifier::HttpServer;

#[derive(Parser)]
#[command(name = "payment-verifier")]
#[command(about = "Tracks blockchain payments until they are confirmed", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Built-in defaults are used if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => VerifierConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "payment-verifier starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        networks = config.networks.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (rx, Some(watcher.run()?))
        }
        None => (tokio::sync::mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
