//! Upstream forwarding.
//!
//! # Responsibilities
//! - Look up the route for a request
//! - Rewrite the URI onto the route's upstream
//! - Forward with the pooled HTTP client and hand back the streaming response
//!
//! # Design Decisions
//! - Every failure is returned as a [`ProxyError`]; rendering is left to the
//!   filter pipeline so all failures share one envelope
//! - The response body is not touched here; it streams straight from the
//!   upstream connection into the pipeline

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tower::Service;

use crate::routing::{RequestTarget, Router};

/// Failure while forwarding a request upstream.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no route matches {path}")]
    NoRoute { path: String },

    #[error("route {route}: cannot build upstream uri: {source}")]
    InvalidUpstreamUri {
        route: String,
        #[source]
        source: axum::http::Error,
    },

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Tower service forwarding requests to the matched upstream.
#[derive(Clone)]
pub struct ProxyService {
    router: Arc<Router>,
    client: Client<HttpConnector, Body>,
}

impl ProxyService {
    pub fn new(router: Arc<Router>, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { router, client }
    }
}

impl Service<Request<Body>> for ProxyService {
    type Response = Response<Body>;
    type Error = ProxyError;
    type Future = BoxFuture<'static, Result<Response<Body>, ProxyError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let router = self.router.clone();
        let client = self.client.clone();
        Box::pin(async move { forward(&router, &client, req).await })
    }
}

async fn forward(
    router: &Router,
    client: &Client<HttpConnector, Body>,
    req: Request<Body>,
) -> Result<Response<Body>, ProxyError> {
    let (route_name, uri) = {
        let target = RequestTarget::of(&req);
        let Some(matched) = router.match_target(&target) else {
            return Err(ProxyError::NoRoute {
                path: target.path.to_string(),
            });
        };
        let uri = matched
            .route
            .upstream_uri(req.uri(), matched.matched_len)
            .map_err(|source| ProxyError::InvalidUpstreamUri {
                route: matched.route.name.clone(),
                source,
            })?;
        (matched.route.name.clone(), uri)
    };

    tracing::debug!(route = %route_name, upstream = %uri, "Forwarding request");

    let (mut parts, body) = req.into_parts();
    parts.uri = uri;
    let response: Response<Incoming> = client.request(Request::from_parts(parts, body)).await?;

    let (parts, body) = response.into_parts();
    Ok(Response::from_parts(parts, Body::new(body)))
}
