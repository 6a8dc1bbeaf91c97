//! Filter pipeline: the per-request entry point.
//!
//! # Responsibilities
//! - Stamp every request with a [`RequestContext`] and trace header
//! - Short-circuit requests carrying the configured query parameter
//! - Call the downstream service through an [`InterceptingSink`]
//! - Normalize every failure, including panics, into the error envelope
//! - Record latency once the response body has been written
//!
//! # Design Decisions
//! - Implemented as a tower `Layer`, so it wraps any
//!   `Service<Request<Body>, Response = Response<Body>>`
//! - The wrapped service is infallible: downstream errors never escape
//! - If the response future is dropped (client gone), nothing is recorded

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, Response, StatusCode};
use futures_util::future::{BoxFuture, FutureExt};
use tower::{BoxError, Layer, Service, ServiceExt};

use crate::config::{ErrorConfig, FilterConfig};
use crate::filter::context::RequestContext;
use crate::filter::error::{ErrorNormalizer, FilterError};
use crate::filter::intercept::{
    BodyInspector, DirectSink, InspectPolicy, InterceptingSink, LoggingInspector, ResponseBody, ResponseSink,
};
use crate::filter::latency::{LatencyRecorder, MetricsSink};
use crate::observability::tags::PathTagsProvider;

/// Shared, immutable state of the pipeline.
#[derive(Clone)]
pub struct FilterState {
    trace_header: HeaderName,
    short_circuit_param: Option<String>,
    policy: InspectPolicy,
    inspector: Arc<dyn BodyInspector>,
    recorder: LatencyRecorder,
    normalizer: ErrorNormalizer,
}

impl FilterState {
    /// Build the pipeline state. `filter.trace_header` must already be a
    /// valid header name (checked by config validation).
    pub fn new(filter: &FilterConfig, error: &ErrorConfig, sink: Arc<dyn MetricsSink>) -> Result<Self, BoxError> {
        let trace_header = HeaderName::from_bytes(filter.trace_header.as_bytes())?;
        Ok(Self {
            trace_header,
            short_circuit_param: filter.short_circuit_param.clone(),
            policy: InspectPolicy::new(&filter.inspect_content_types, filter.max_body_bytes),
            inspector: Arc::new(LoggingInspector::new(filter.log_bodies)),
            recorder: LatencyRecorder::new(sink, Arc::new(PathTagsProvider)),
            normalizer: ErrorNormalizer::new(error),
        })
    }

    /// Replace the inspection step.
    pub fn with_inspector(mut self, inspector: Arc<dyn BodyInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    /// Replace the latency recorder, e.g. to use a custom tag provider.
    pub fn with_recorder(mut self, recorder: LatencyRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    fn short_circuits(&self, query: Option<&str>) -> bool {
        match (&self.short_circuit_param, query) {
            (Some(param), Some(query)) => url::form_urlencoded::parse(query.as_bytes()).any(|(k, _)| k == param.as_str()),
            _ => false,
        }
    }

    fn trace_value(&self, ctx: &RequestContext) -> Option<HeaderValue> {
        match HeaderValue::from_str(ctx.trace_id.as_str()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(trace_id = %ctx.trace_id, error = %e, "Trace id is not a valid header value");
                None
            }
        }
    }
}

/// Layer that applies the filter pipeline to a service.
#[derive(Clone)]
pub struct FilterLayer {
    state: Arc<FilterState>,
}

impl FilterLayer {
    pub fn new(state: FilterState) -> Self {
        Self { state: Arc::new(state) }
    }
}

impl<S> Layer<S> for FilterLayer {
    type Service = FilterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FilterService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Service produced by [`FilterLayer`].
#[derive(Clone)]
pub struct FilterService<S> {
    inner: S,
    state: Arc<FilterState>,
}

impl<S> Service<Request<Body>> for FilterService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response<Body>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is awaited per call so its errors
        // can be normalized like any other downstream failure.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();
        Box::pin(async move { Ok(run(state, inner, req).await) })
    }
}

async fn run<S>(state: Arc<FilterState>, inner: S, mut req: Request<Body>) -> Response<Body>
where
    S: Service<Request<Body>, Response = Response<Body>> + Send,
    S::Future: Send,
    S::Error: Into<BoxError>,
{
    let ctx = Arc::new(RequestContext::begin(req.method().clone(), req.uri().path()));
    tracing::info!(trace_id = %ctx.trace_id, method = %ctx.method, path = %ctx.path, "starting {}", ctx.trace_id);

    let trace_value = state.trace_value(&ctx);
    if let Some(value) = &trace_value {
        req.headers_mut().insert(state.trace_header.clone(), value.clone());
    }
    req.extensions_mut().insert(ctx.clone());

    if state.short_circuits(req.uri().query()) {
        tracing::info!(trace_id = %ctx.trace_id, "no permission");
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        return response;
    }

    let outcome = AssertUnwindSafe(forward(&state, &ctx, inner, req))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(FilterError::Panic(panic_message(panic.as_ref()))));

    let (mut response, failure) = match outcome {
        Ok(response) => (response, None),
        Err(failure) => (state.normalizer.render(&ctx.method, &ctx.path, &failure), Some(failure)),
    };

    if let Some(value) = trace_value {
        response.headers_mut().insert(state.trace_header.clone(), value);
    }

    if let Some(elapsed) = state.recorder.record_completion(&ctx, response.status(), failure.as_ref()) {
        tracing::info!(
            trace_id = %ctx.trace_id,
            status = response.status().as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "finish {} elapsed {} ms",
            ctx.trace_id,
            elapsed.as_millis()
        );
    }

    response
}

async fn forward<S>(
    state: &FilterState,
    ctx: &Arc<RequestContext>,
    inner: S,
    req: Request<Body>,
) -> Result<Response<Body>, FilterError>
where
    S: Service<Request<Body>, Response = Response<Body>>,
    S::Error: Into<BoxError>,
{
    let response = inner
        .oneshot(req)
        .await
        .map_err(|e| FilterError::Downstream(e.into()))?;

    let (parts, body) = response.into_parts();
    let sink = InterceptingSink::new(
        DirectSink::new(parts),
        ctx.clone(),
        state.inspector.clone(),
        state.policy.clone(),
    );
    Ok(sink.write_with(ResponseBody::classify(body)).await?)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
