//! End-to-end latency recording.
//!
//! # Responsibilities
//! - Compute the elapsed time of a completed request
//! - Emit one sample per completed request, keyed by route
//! - Hand the request tag set to the metrics sink
//!
//! # Design Decisions
//! - The sink is injected; nothing here resolves a global registry
//! - A missing start time means "no sample", never a failure
//! - Cancelled requests never reach the recorder, so they produce no sample

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::StatusCode;

use crate::filter::context::RequestContext;
use crate::filter::error::FilterError;
use crate::observability::tags::{RequestTags, TagsProvider};

/// One latency observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    pub route_key: String,
    pub duration: Duration,
}

/// Destination for latency samples. Must tolerate concurrent calls.
pub trait MetricsSink: Send + Sync {
    fn record_latency(&self, sample: &MetricSample);

    /// Per-request tag set for tracing/metrics backends.
    fn record_request(&self, _tags: &RequestTags, _duration: Duration) {}
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    samples: Mutex<Vec<MetricSample>>,
    requests: Mutex<Vec<RequestTags>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<RequestTags> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl MetricsSink for InMemorySink {
    fn record_latency(&self, sample: &MetricSample) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.push(sample.clone());
        }
    }

    fn record_request(&self, tags: &RequestTags, _duration: Duration) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(tags.clone());
        }
    }
}

/// Records request latency into a [`MetricsSink`].
#[derive(Clone)]
pub struct LatencyRecorder {
    sink: Arc<dyn MetricsSink>,
    tags: Arc<dyn TagsProvider>,
}

impl LatencyRecorder {
    pub fn new(sink: Arc<dyn MetricsSink>, tags: Arc<dyn TagsProvider>) -> Self {
        Self { sink, tags }
    }

    /// Record `now - started_at` under `route_key`.
    ///
    /// Returns the recorded duration, or `None` when there was no start time.
    pub fn record(&self, route_key: &str, started_at: Option<Instant>) -> Option<Duration> {
        let started_at = started_at?;
        let sample = MetricSample {
            route_key: route_key.to_string(),
            duration: started_at.elapsed(),
        };
        self.sink.record_latency(&sample);
        Some(sample.duration)
    }

    /// Record a completed request: the route sample plus its tag set.
    pub fn record_completion(
        &self,
        ctx: &RequestContext,
        status: StatusCode,
        failure: Option<&FilterError>,
    ) -> Option<Duration> {
        let duration = self.record(ctx.route_key(), Some(ctx.started_at))?;
        let tags = self.tags.request_tags(ctx, status, failure);
        self.sink.record_request(&tags, duration);
        Some(duration)
    }
}
