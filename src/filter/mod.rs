//! Request/response filter subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pipeline.rs (entry point, one task per request)
//!     → context.rs + trace.rs (RequestContext, trace id, start time)
//!     → [short-circuit on configured query parameter]
//!     → downstream service
//!     → intercept.rs (wrap the response sink)
//!         → aggregate.rs (join streamed chunks, release each once)
//!         → BodyInspector (decode + inspect textual bodies)
//!     → latency.rs (one sample per completed request)
//!
//! Any failure on the way:
//!     → error.rs (log + fixed JSON envelope, status 500)
//! ```
//!
//! # Design Decisions
//! - No blocking waits; every suspension point is a body frame or the
//!   downstream future
//! - Per-request state is a typed value passed explicitly, never a string map
//! - The metrics sink is injected at construction

pub mod aggregate;
pub mod context;
pub mod error;
pub mod intercept;
pub mod latency;
pub mod pipeline;
pub mod trace;

pub use aggregate::{aggregate, AggregatedBody, AggregationError};
pub use context::RequestContext;
pub use error::{ErrorEnvelope, ErrorNormalizer, FilterError};
pub use intercept::{BodyInspector, InspectPolicy, InterceptingSink, LoggingInspector, ResponseBody, ResponseSink};
pub use latency::{InMemorySink, LatencyRecorder, MetricSample, MetricsSink};
pub use pipeline::{FilterLayer, FilterService, FilterState};
pub use trace::TraceId;
