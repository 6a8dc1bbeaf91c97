//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! filter pipeline produces:
//!     → logging.rs (structured log events: starting / finish / errors)
//!     → tags.rs (method, uri, exception, status, outcome per request)
//!     → metrics.rs (per-route latency histogram, request counters)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
pub mod tags;
