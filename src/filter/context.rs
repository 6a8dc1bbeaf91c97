//! Per-request context.

use std::time::Instant;

use axum::http::Method;

use crate::filter::trace::{self, TraceId};

/// Everything the pipeline knows about one request.
///
/// Created once at pipeline entry and never mutated afterwards. It is also
/// inserted into the request extensions so downstream handlers can read the
/// trace id without string-keyed lookups.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Raw request path, also used as the route key for metrics.
    pub path: String,
    pub trace_id: TraceId,
    pub started_at: Instant,
}

impl RequestContext {
    /// Stamp a new context for the given method and raw path.
    pub fn begin(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (trace_id, started_at) = trace::begin(&method, &path);
        Self {
            method,
            path,
            trace_id,
            started_at,
        }
    }

    /// The key latency samples are grouped under.
    pub fn route_key(&self) -> &str {
        &self.path
    }
}
