//! Response interception.
//!
//! # Responsibilities
//! - Classify the outbound body once at the boundary (materialized or streaming)
//! - Aggregate streaming bodies and run the inspection step over textual ones
//! - Forward the resulting bytes to the wrapped sink exactly once
//!
//! # Design Decisions
//! - The interceptor is a decorator over [`ResponseSink`]; the original sink
//!   keeps its headers and status, only the body is substituted
//! - The inspection step is an injected [`BodyInspector`] strategy
//! - Only bodies whose content type matches the configured list are decoded;
//!   everything else is forwarded byte for byte
//! - Buffering replaces the upstream chunk timing with a single write. Very
//!   large bodies are bounded by `max_body_bytes`; infinite streams (SSE,
//!   long polling) should not be routed through an intercepting sink

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, response::Parts, HeaderMap, HeaderValue, Response};
use bytes::Bytes;
use http_body::Body as HttpBody;

use crate::filter::aggregate::{aggregate, AggregationError};
use crate::filter::context::RequestContext;

/// Outbound body, resolved once at the framework boundary.
#[derive(Debug)]
pub enum ResponseBody {
    /// The body is already a complete buffer.
    Materialized(Bytes),
    /// The body still has to be polled chunk by chunk.
    Streaming(Body),
}

impl ResponseBody {
    /// Classify a framework body. Bodies that are already at end of stream
    /// are materialized as an empty buffer.
    pub fn classify(body: Body) -> Self {
        if body.is_end_stream() {
            ResponseBody::Materialized(Bytes::new())
        } else {
            ResponseBody::Streaming(body)
        }
    }

    pub fn into_body(self) -> Body {
        match self {
            ResponseBody::Materialized(bytes) => Body::from(bytes),
            ResponseBody::Streaming(body) => body,
        }
    }
}

/// Something a response body can be written to.
pub trait ResponseSink: Send + Sized {
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Write the body and produce the outbound response.
    fn write_with(
        self,
        body: ResponseBody,
    ) -> impl Future<Output = Result<Response<Body>, AggregationError>> + Send;
}

/// The unwrapped sink: writes whatever body it receives as-is.
#[derive(Debug)]
pub struct DirectSink {
    parts: Parts,
}

impl DirectSink {
    pub fn new(parts: Parts) -> Self {
        Self { parts }
    }
}

impl ResponseSink for DirectSink {
    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    async fn write_with(self, body: ResponseBody) -> Result<Response<Body>, AggregationError> {
        Ok(Response::from_parts(self.parts, body.into_body()))
    }
}

/// Inspection/transformation step run over decoded response text.
pub trait BodyInspector: Send + Sync {
    /// Receives the decoded body and returns the text to forward.
    fn inspect(&self, ctx: &RequestContext, text: String) -> String;
}

impl<F> BodyInspector for F
where
    F: Fn(&RequestContext, String) -> String + Send + Sync,
{
    fn inspect(&self, ctx: &RequestContext, text: String) -> String {
        self(ctx, text)
    }
}

/// Read-only inspector that logs the body it sees.
#[derive(Debug, Clone, Default)]
pub struct LoggingInspector {
    log_bodies: bool,
}

impl LoggingInspector {
    pub fn new(log_bodies: bool) -> Self {
        Self { log_bodies }
    }
}

impl BodyInspector for LoggingInspector {
    fn inspect(&self, ctx: &RequestContext, text: String) -> String {
        if self.log_bodies {
            tracing::info!(trace_id = %ctx.trace_id, bytes = text.len(), body = %text, "Processing response data");
        } else {
            tracing::debug!(trace_id = %ctx.trace_id, bytes = text.len(), "Processing response data");
        }
        text
    }
}

/// Which bodies get decoded and how much may be buffered.
#[derive(Debug, Clone)]
pub struct InspectPolicy {
    content_types: Vec<String>,
    max_body_bytes: usize,
}

impl InspectPolicy {
    pub fn new(content_types: &[String], max_body_bytes: usize) -> Self {
        Self {
            content_types: content_types.iter().map(|c| c.to_ascii_lowercase()).collect(),
            max_body_bytes,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Case-insensitive substring match, so `application/json; charset=utf-8`
    /// matches `application/json`. A missing content type never matches.
    pub fn is_textual(&self, headers: &HeaderMap) -> bool {
        let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let content_type = content_type.to_ascii_lowercase();
        self.content_types.iter().any(|c| content_type.contains(c.as_str()))
    }
}

impl Default for InspectPolicy {
    fn default() -> Self {
        Self::new(&["application/json".to_string()], 10 * 1024 * 1024)
    }
}

/// Decorator that buffers the whole body before writing it to `inner`.
pub struct InterceptingSink<S> {
    inner: S,
    ctx: Arc<RequestContext>,
    inspector: Arc<dyn BodyInspector>,
    policy: InspectPolicy,
}

impl<S: ResponseSink> InterceptingSink<S> {
    pub fn new(
        inner: S,
        ctx: Arc<RequestContext>,
        inspector: Arc<dyn BodyInspector>,
        policy: InspectPolicy,
    ) -> Self {
        Self {
            inner,
            ctx,
            inspector,
            policy,
        }
    }

    fn transform(&self, bytes: Bytes) -> Bytes {
        if !self.policy.is_textual(self.inner.headers()) {
            return bytes;
        }

        let text = match std::str::from_utf8(&bytes) {
            Ok(text) if !text.trim().is_empty() => text.to_owned(),
            Ok(_) => return bytes,
            Err(e) => {
                tracing::debug!(trace_id = %self.ctx.trace_id, error = %e, "Body is not valid UTF-8, skipping inspection");
                return bytes;
            }
        };

        let inspected = self.inspector.inspect(&self.ctx, text);
        if inspected.as_bytes() == bytes.as_ref() {
            bytes
        } else {
            Bytes::from(inspected.into_bytes())
        }
    }
}

impl<S: ResponseSink> ResponseSink for InterceptingSink<S> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    async fn write_with(mut self, body: ResponseBody) -> Result<Response<Body>, AggregationError> {
        let stream = match body {
            materialized @ ResponseBody::Materialized(_) => {
                return self.inner.write_with(materialized).await;
            }
            ResponseBody::Streaming(stream) => stream,
        };

        let aggregated = aggregate(stream, self.policy.max_body_bytes()).await?;
        tracing::trace!(
            trace_id = %self.ctx.trace_id,
            chunks = aggregated.chunk_count(),
            bytes = aggregated.len(),
            "Response body aggregated"
        );

        let bytes = self.transform(aggregated.into_bytes());

        let headers = self.inner.headers_mut();
        headers.remove(header::TRANSFER_ENCODING);
        if headers.contains_key(header::CONTENT_LENGTH) {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        }

        self.inner.write_with(ResponseBody::Materialized(bytes)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use futures_util::stream;
    use http_body::Frame;
    use http_body_util::{BodyExt, StreamBody};

    fn ctx() -> Arc<RequestContext> {
        Arc::new(RequestContext::begin(Method::GET, "/orders/42"))
    }

    fn parts(content_type: Option<&str>) -> Parts {
        let mut builder = Response::builder().status(StatusCode::OK);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn chunked(parts: &[&'static str]) -> Body {
        let frames: Vec<Result<Frame<Bytes>, std::io::Error>> = parts
            .iter()
            .map(|p| Ok(Frame::data(Bytes::from_static(p.as_bytes()))))
            .collect();
        Body::new(StreamBody::new(stream::iter(frames)))
    }

    fn upper() -> Arc<dyn BodyInspector> {
        Arc::new(|_: &RequestContext, text: String| text.to_uppercase())
    }

    fn identity() -> Arc<dyn BodyInspector> {
        Arc::new(|_: &RequestContext, text: String| text)
    }

    async fn body_bytes(response: Response<Body>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_policy_matches_json_with_charset() {
        let policy = InspectPolicy::default();
        let headers = parts(Some("Application/JSON; charset=utf-8")).headers;
        assert!(policy.is_textual(&headers));
        assert!(!policy.is_textual(&parts(Some("text/html")).headers));
        assert!(!policy.is_textual(&parts(None).headers));
    }

    #[test]
    fn test_classify_empty_body_is_materialized() {
        assert!(matches!(ResponseBody::classify(Body::empty()), ResponseBody::Materialized(b) if b.is_empty()));
        assert!(matches!(ResponseBody::classify(chunked(&["a", "b"])), ResponseBody::Streaming(_)));
    }

    #[tokio::test]
    async fn test_identity_is_byte_identical_for_any_content_type() {
        for content_type in [Some("application/json"), Some("text/plain"), Some("application/octet-stream"), None] {
            let sink = InterceptingSink::new(
                DirectSink::new(parts(content_type)),
                ctx(),
                identity(),
                InspectPolicy::default(),
            );
            let response = sink
                .write_with(ResponseBody::Streaming(chunked(&["{\"id\":", "42", "}"])))
                .await
                .unwrap();
            assert_eq!(body_bytes(response).await, Bytes::from_static(b"{\"id\":42}"));
        }
    }

    #[tokio::test]
    async fn test_non_json_is_never_transformed() {
        let sink = InterceptingSink::new(
            DirectSink::new(parts(Some("text/plain"))),
            ctx(),
            upper(),
            InspectPolicy::default(),
        );
        let response = sink
            .write_with(ResponseBody::Streaming(chunked(&["hello ", "world"])))
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_json_transform_rewrites_content_length() {
        let mut response_parts = parts(Some("application/json"));
        response_parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(9));
        let inspector: Arc<dyn BodyInspector> =
            Arc::new(|_: &RequestContext, text: String| text.replace("\"a\"", "\"alpha\""));
        let sink = InterceptingSink::new(DirectSink::new(response_parts), ctx(), inspector, InspectPolicy::default());

        let response = sink
            .write_with(ResponseBody::Streaming(chunked(&["{\"k\":", "\"a\"}"])))
            .await
            .unwrap();

        assert_eq!(response.headers()[header::CONTENT_LENGTH], "13");
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"{\"k\":\"alpha\"}"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_skips_inspection() {
        let frames: Vec<Result<Frame<Bytes>, std::io::Error>> =
            vec![Ok(Frame::data(Bytes::from_static(&[0xff, 0xfe]))), Ok(Frame::data(Bytes::from_static(b"x")))];
        let sink = InterceptingSink::new(
            DirectSink::new(parts(Some("application/json"))),
            ctx(),
            upper(),
            InspectPolicy::default(),
        );

        let response = sink
            .write_with(ResponseBody::Streaming(Body::new(StreamBody::new(stream::iter(frames)))))
            .await
            .unwrap();

        assert_eq!(body_bytes(response).await.as_ref(), &[0xff, 0xfe, b'x']);
    }

    #[tokio::test]
    async fn test_materialized_body_passes_through() {
        let sink = InterceptingSink::new(
            DirectSink::new(parts(Some("application/json"))),
            ctx(),
            upper(),
            InspectPolicy::default(),
        );
        let response = sink
            .write_with(ResponseBody::Materialized(Bytes::from_static(b"{\"a\":1}")))
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_stream_failure_is_reported() {
        let frames: Vec<Result<Frame<Bytes>, std::io::Error>> = vec![
            Ok(Frame::data(Bytes::from_static(b"partial"))),
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "upstream closed")),
        ];
        let sink = InterceptingSink::new(
            DirectSink::new(parts(Some("application/json"))),
            ctx(),
            identity(),
            InspectPolicy::default(),
        );

        let err = sink
            .write_with(ResponseBody::Streaming(Body::new(StreamBody::new(stream::iter(frames)))))
            .await
            .unwrap_err();

        assert!(matches!(err, AggregationError::Stream(_)));
    }

    #[tokio::test]
    async fn test_oversized_body_fails() {
        let sink = InterceptingSink::new(
            DirectSink::new(parts(Some("text/plain"))),
            ctx(),
            identity(),
            InspectPolicy::new(&[], 4),
        );

        let err = sink
            .write_with(ResponseBody::Streaming(chunked(&["abc", "def"])))
            .await
            .unwrap_err();

        assert!(matches!(err, AggregationError::TooLarge { limit: 4 }));
    }
}
