//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing layer)
//!     → filter pipeline (trace id, interception, latency, errors)
//!     → timeout
//!     → proxy.rs (route lookup, forward upstream, streaming response)
//!     → back through the pipeline to the client
//! ```

pub mod proxy;
pub mod server;

pub use proxy::{ProxyError, ProxyService};
pub use server::GatewayServer;
