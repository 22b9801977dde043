//! Request-routing gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                   GATEWAY                     │
//!                    │                                               │
//!  Client Request    │  ┌─────────┐   ┌───────────┐   ┌──────────┐  │
//!  ──────────────────┼─▶│  http   │──▶│  routing  │──▶│  proxy   │──┼──▶ Upstream
//!                    │  │ server  │   │   table   │   │forwarder │  │
//!                    │  └─────────┘   └───────────┘   └──────────┘  │
//!                    │       ▲          resolve →        stream     │
//!  Client Response   │       │          rewrite          relay      │
//!  ◀─────────────────┼───────┴──────────────────────────────┘       │
//!                    │                                               │
//!                    │  ┌─────────────────────────────────────────┐  │
//!                    │  │         Cross-Cutting Concerns          │  │
//!                    │  │  config · observability · lifecycle     │  │
//!                    │  └─────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use route_gateway::config::{self, GatewayConfig};
use route_gateway::http::HttpServer;
use route_gateway::lifecycle::{signals, Shutdown};
use route_gateway::observability::{logging, metrics};

/// Path-rewriting HTTP gateway.
#[derive(Parser, Debug)]
#[command(name = "route-gateway", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::loader::load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rules = config.rules.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // Fail fast: every rule compiles before the listener binds.
    let server = HttpServer::new(&config)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
