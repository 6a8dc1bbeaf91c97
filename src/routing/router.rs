//! Route lookup.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes sorted by priority, highest first; ties keep config order
//! - First match wins; no match is explicit (`None`)

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;

use crate::config::RouteConfig;
use crate::routing::matcher::{RequestTarget, RouteMatcher};

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    matcher: RouteMatcher,
    scheme: Scheme,
    authority: Authority,
    strip_prefix: bool,
}

impl Route {
    fn compile(config: &RouteConfig) -> Option<Self> {
        let upstream: Uri = config.upstream.parse().ok()?;
        let parts = upstream.into_parts();
        Some(Self {
            name: config.name.clone(),
            matcher: RouteMatcher::new(config.host.as_deref(), config.path_prefix.as_deref()),
            scheme: parts.scheme.unwrap_or(Scheme::HTTP),
            authority: parts.authority?,
            strip_prefix: config.strip_prefix,
        })
    }

    /// Rewrite an inbound URI onto this route's upstream.
    pub fn upstream_uri(&self, inbound: &Uri, matched_len: usize) -> Result<Uri, axum::http::Error> {
        let path = inbound.path();
        let path = if self.strip_prefix { &path[matched_len..] } else { path };
        let path = if path.is_empty() { "/" } else { path };
        let path_and_query = match inbound.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };

        Ok(Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query.parse::<PathAndQuery>()?)
            .build()?)
    }
}

/// A route together with the length of the path prefix it matched.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub matched_len: usize,
}

/// Immutable route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes from configuration. Routes whose upstream does not
    /// parse are skipped with a warning (validation rejects them earlier).
    pub fn from_config(mut configs: Vec<RouteConfig>) -> Self {
        configs.sort_by(|a, b| b.priority.cmp(&a.priority));
        let routes = configs
            .iter()
            .filter_map(|c| {
                let route = Route::compile(c);
                if route.is_none() {
                    tracing::warn!(route = %c.name, upstream = %c.upstream, "Skipping route with invalid upstream");
                }
                route
            })
            .collect();
        Self { routes }
    }

    pub fn match_target(&self, target: &RequestTarget<'_>) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            route
                .matcher
                .matches(target)
                .map(|matched_len| RouteMatch { route, matched_len })
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
