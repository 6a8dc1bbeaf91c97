//! API gateway with request tracing, response inspection and latency metrics.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────────┐
//!                    │                     GATEWAY                       │
//!   Client Request   │  ┌────────┐   ┌──────────────────┐   ┌─────────┐  │
//!   ─────────────────┼─▶│  http  │──▶│ filter pipeline  │──▶│  proxy  │──┼──▶ Upstream
//!                    │  │ server │   │ trace id / stamp │   │ routing │  │
//!                    │  └────────┘   └──────────────────┘   └────┬────┘  │
//!                    │                                           │       │
//!   Client Response  │  ┌──────────────────────────────────┐     │       │
//!   ◀────────────────┼──│ intercept: aggregate + inspect   │◀────┘       │
//!                    │  │ latency sample / error envelope  │             │
//!                    │  └──────────────────────────────────┘             │
//!                    └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use trace_gateway::config::{load_config, GatewayConfig};
use trace_gateway::lifecycle::{signals, Shutdown};
use trace_gateway::observability::{logging, metrics};
use trace_gateway::GatewayServer;

#[derive(Parser, Debug)]
#[command(name = "trace-gateway", version, about = "API gateway filter: tracing, inspection, latency metrics")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "trace-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.filter.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }
    let sink = Arc::new(metrics::PrometheusSink::new(config.observability.latency_metric.clone()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, sink)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
