//! latency-balancer
//!
//! Latency-aware reverse proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │               LATENCY BALANCER               │
//!                         │                                              │
//!   Client Request        │  ┌─────────┐    ┌─────────────┐              │
//!   ──────────────────────┼─▶│  http   │───▶│    proxy    │──── forward ─┼──▶ Backend A
//!                         │  │ server  │    │ coordinator │──── retry ───┼──▶ Backend B
//!   Client Response       │  └─────────┘    └──────┬──────┘              │
//!   ◀─────────────────────┼──── relay ◀──────────  │ snapshot            │
//!                         │                 ┌──────▼──────┐              │
//!                         │                 │  registry   │◀── update ───┼── health pollers
//!                         │                 │ + selector  │              │   (GET /status)
//!                         │                 └─────────────┘              │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use latency_balancer::config::load_config;
use latency_balancer::lifecycle::{signals, Shutdown};
use latency_balancer::observability::{logging, metrics};
use latency_balancer::HttpServer;

#[derive(Parser)]
#[command(name = "latency-balancer")]
#[command(about = "Routes requests to the backend with the fastest recent response", long_about = None)]
struct Cli {
    /// Optional TOML configuration file. `PORT` always overrides listener.port.
    #[arg(short, long, env = "LB_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logging comes up before config so config errors are visible.
    let default_filter = latency_balancer::config::ObservabilityConfig::default().log_level;
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => {
            logging::init_logging(&config.observability.log_level)?;
            config
        }
        Err(e) => {
            logging::init_logging(&default_filter)?;
            tracing::error!(error = %e, "latency-balancer: invalid configuration");
            return Err(e.into());
        }
    };

    tracing::info!("latency-balancer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        backends = ?config.backends.addresses(),
        interval_ms = config.health_check.interval_ms,
        deadline_ms = config.proxy.deadline_ms,
        relay_backend_status = config.proxy.relay_backend_status,
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

    let bind_address = config
        .listener
        .bind_address()
        .ok_or("listener port missing after validation")?;
    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "latency-balancer: listening");

    let shutdown = Shutdown::new();
    signals::install(shutdown.clone());

    HttpServer::new(config).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
