//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder and scrape endpoint once at startup
//! - Record per-route latency and the per-request tag set
//!
//! # Metrics
//! - `<latency_metric>` (histogram, ms): latency by `uri`
//! - `http_server_requests_total` (counter): requests by method, uri, exception, status, outcome
//! - `http_server_requests_duration_ms` (histogram): same labels
//!
//! # Design Decisions
//! - The recorder is process-wide and installed exactly once by the binary;
//!   everything else only sees an `Arc<dyn MetricsSink>`
//! - Without an installed recorder the macros are no-ops

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::filter::latency::{MetricSample, MetricsSink};
use crate::observability::tags::RequestTags;

/// Install the global Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// [`MetricsSink`] backed by the `metrics` facade.
#[derive(Debug, Clone)]
pub struct PrometheusSink {
    latency_metric: String,
}

impl PrometheusSink {
    pub fn new(latency_metric: impl Into<String>) -> Self {
        Self {
            latency_metric: latency_metric.into(),
        }
    }
}

impl MetricsSink for PrometheusSink {
    fn record_latency(&self, sample: &MetricSample) {
        metrics::histogram!(self.latency_metric.clone(), "uri" => sample.route_key.clone())
            .record(millis(sample.duration));
    }

    fn record_request(&self, tags: &RequestTags, duration: Duration) {
        metrics::counter!(
            "http_server_requests_total",
            "method" => tags.method.clone(),
            "uri" => tags.uri.clone(),
            "exception" => tags.exception.clone(),
            "status" => tags.status.clone(),
            "outcome" => tags.outcome.clone()
        )
        .increment(1);
        metrics::histogram!(
            "http_server_requests_duration_ms",
            "method" => tags.method.clone(),
            "uri" => tags.uri.clone(),
            "exception" => tags.exception.clone(),
            "status" => tags.status.clone(),
            "outcome" => tags.outcome.clone()
        )
        .record(millis(duration));
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
