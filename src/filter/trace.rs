//! Trace id generation.
//!
//! Trace ids are built from the request method, the raw path and a
//! millisecond wall-clock stamp, wrapped in `#` markers:
//! `#GET:/orders/42093015123#`. They exist for log correlation only; two
//! requests for the same method and path inside one millisecond collide.

use std::fmt;
use std::time::Instant;

use axum::http::Method;
use chrono::Local;

/// Human-readable correlation id for one request's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    /// Build a trace id from its parts and an already formatted `HHmmssSSS` stamp.
    pub fn from_parts(method: &Method, path: &str, stamp: &str) -> Self {
        Self(format!("#{}:{}{}#", method, path, stamp))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stamp a new request: returns its trace id and the monotonic start time.
pub fn begin(method: &Method, path: &str) -> (TraceId, Instant) {
    let started_at = Instant::now();
    let stamp = Local::now().format("%H%M%S%3f").to_string();
    (TraceId::from_parts(method, path, &stamp), started_at)
}
