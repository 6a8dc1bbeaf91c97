//! Route matching logic.
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port
//! - Path matching is case-sensitive and segment-aware: `/orders` matches
//!   `/orders` and `/orders/42` but not `/ordersx`
//! - A route without conditions matches everything

use axum::http::{header, Request};

/// The parts of a request routing decisions are based on.
#[derive(Debug, Clone, Copy)]
pub struct RequestTarget<'a> {
    pub host: Option<&'a str>,
    pub path: &'a str,
}

impl<'a> RequestTarget<'a> {
    pub fn of<B>(req: &'a Request<B>) -> Self {
        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host());
        Self {
            host,
            path: req.uri().path(),
        }
    }
}

/// Conditions a route places on a request.
#[derive(Debug, Clone, Default)]
pub struct RouteMatcher {
    host: Option<String>,
    path_prefix: Option<String>,
}

impl RouteMatcher {
    pub fn new(host: Option<&str>, path_prefix: Option<&str>) -> Self {
        Self {
            host: host.map(str::to_ascii_lowercase),
            path_prefix: path_prefix.map(|p| p.trim_end_matches('/').to_string()),
        }
    }

    /// Returns the matched path prefix length when the target matches.
    pub fn matches(&self, target: &RequestTarget<'_>) -> Option<usize> {
        if let Some(expected) = &self.host {
            let host = target.host?;
            let host = host.split(':').next().unwrap_or(host);
            if !host.eq_ignore_ascii_case(expected) {
                return None;
            }
        }

        match &self.path_prefix {
            None => Some(0),
            Some(prefix) if prefix.is_empty() => Some(0),
            Some(prefix) => {
                let rest = target.path.strip_prefix(prefix.as_str())?;
                (rest.is_empty() || rest.starts_with('/')).then_some(prefix.len())
            }
        }
    }
}
