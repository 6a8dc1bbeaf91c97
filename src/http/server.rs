//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router: filter pipeline over the upstream forwarder
//! - Apply the downstream timeout and request tracing layers
//! - Serve on a listener until shutdown is signalled
//!
//! # Design Decisions
//! - Every request goes through the fallback service, so the pipeline sees
//!   all of them, including ones no route matches
//! - The timeout wraps only the downstream call; an elapsed timeout is a
//!   downstream failure and gets the error envelope

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower::{BoxError, Layer};
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::filter::latency::MetricsSink;
use crate::filter::pipeline::{FilterLayer, FilterState};
use crate::http::proxy::ProxyService;
use crate::lifecycle::ShutdownSignal;
use crate::routing::Router as RouteTable;

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Create a new server with the given configuration and metrics sink.
    pub fn new(config: GatewayConfig, sink: Arc<dyn MetricsSink>) -> Result<Self, BoxError> {
        let state = FilterState::new(&config.filter, &config.error, sink)?;
        Ok(Self::with_state(config, state))
    }

    /// Create a server with a prepared filter state (custom inspector or recorder).
    pub fn with_state(config: GatewayConfig, state: FilterState) -> Self {
        let routes = Arc::new(RouteTable::from_config(config.routes.clone()));
        tracing::info!(routes = routes.len(), "Route table compiled");

        let proxy = ProxyService::new(routes, Duration::from_secs(config.timeouts.connect_secs));
        let downstream = tower::timeout::TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)).layer(proxy);
        let pipeline = FilterLayer::new(state).layer(downstream);

        let router = Router::new()
            .fallback_service(pipeline)
            .layer(TraceLayer::new_for_http());

        Self { router, config }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The underlying router, e.g. for in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
