//! API gateway filter library.
//!
//! Wraps every request in a pipeline that assigns a trace id, buffers and
//! inspects the response body, records per-route latency and renders every
//! unhandled failure as one fixed JSON error envelope.

pub mod config;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use filter::{FilterLayer, FilterState};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
