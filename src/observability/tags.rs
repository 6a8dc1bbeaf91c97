//! Request tag provider.
//!
//! Supplies the `{method, uri, exception, status, outcome}` tag set recorded
//! for each completed request. The `uri` tag is the raw request path rather
//! than a route template, so each distinct path gets its own series.

use axum::http::StatusCode;

use crate::filter::context::RequestContext;
use crate::filter::error::FilterError;

/// Tag set describing one completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTags {
    pub method: String,
    pub uri: String,
    pub exception: String,
    pub status: String,
    pub outcome: String,
}

/// Builds the tag set for a completed request.
pub trait TagsProvider: Send + Sync {
    fn request_tags(&self, ctx: &RequestContext, status: StatusCode, failure: Option<&FilterError>) -> RequestTags;
}

/// Default provider: raw path as `uri`, failure kind as `exception`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathTagsProvider;

impl TagsProvider for PathTagsProvider {
    fn request_tags(&self, ctx: &RequestContext, status: StatusCode, failure: Option<&FilterError>) -> RequestTags {
        RequestTags {
            method: ctx.method.to_string(),
            uri: ctx.path.clone(),
            exception: failure.map(|f| f.kind()).unwrap_or("None").to_string(),
            status: status.as_u16().to_string(),
            outcome: outcome(status).to_string(),
        }
    }
}

/// Outcome class of a status code.
pub fn outcome(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "INFORMATIONAL",
        200..=299 => "SUCCESS",
        300..=399 => "REDIRECTION",
        400..=499 => "CLIENT_ERROR",
        500..=599 => "SERVER_ERROR",
        _ => "UNKNOWN",
    }
}
