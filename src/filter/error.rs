//! Failure normalization.
//!
//! Every failure that reaches the pipeline boundary is rendered the same
//! way: one error log line and a fixed JSON envelope with status 500. The
//! kind of failure only shows up in logs and metric tags, never in the
//! response.

use axum::body::Body;
use axum::http::{Method, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower::BoxError;

use crate::config::ErrorConfig;
use crate::filter::aggregate::AggregationError;

/// Unhandled failure observed by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The response body could not be reconstructed.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Routing, upstream or business logic failed.
    #[error("{0}")]
    Downstream(BoxError),

    /// The downstream handler panicked.
    #[error("downstream handler panicked: {0}")]
    Panic(String),
}

impl FilterError {
    /// Short failure kind, used as the `exception` metric tag.
    pub fn kind(&self) -> &'static str {
        match self {
            FilterError::Aggregation(_) => "AggregationFailure",
            FilterError::Downstream(e) if e.is::<tower::timeout::error::Elapsed>() => "Timeout",
            FilterError::Downstream(_) => "UnhandledDownstreamFailure",
            FilterError::Panic(_) => "Panic",
        }
    }
}

/// Fixed-shape error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub code: String,
    pub msg: String,
    pub data: Option<serde_json::Value>,
}

/// Renders failures into [`ErrorEnvelope`] responses.
#[derive(Debug, Clone)]
pub struct ErrorNormalizer {
    code: String,
    msg: String,
}

impl ErrorNormalizer {
    /// Status used for every normalized failure.
    pub const STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

    pub fn new(config: &ErrorConfig) -> Self {
        Self {
            code: config.code.clone(),
            msg: config.msg.clone(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            success: false,
            code: self.code.clone(),
            msg: self.msg.clone(),
            data: None,
        }
    }

    /// Log the failure and build the error response.
    pub fn render(&self, method: &Method, path: &str, failure: &FilterError) -> Response<Body> {
        tracing::error!(
            method = %method,
            path = %path,
            kind = failure.kind(),
            "method:{},url:{},message:{}",
            method,
            path,
            failure
        );
        (Self::STATUS, Json(self.envelope())).into_response()
    }
}

impl Default for ErrorNormalizer {
    fn default() -> Self {
        Self::new(&ErrorConfig::default())
    }
}
