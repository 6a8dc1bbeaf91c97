//! Response body aggregation.
//!
//! # Responsibilities
//! - Drain a streamed body frame by frame, in arrival order
//! - Join every data chunk into a single owned buffer
//! - Release every chunk exactly once, on success, error or cancellation
//!
//! # Design Decisions
//! - Chunks are moved into a local `Vec` and consumed by value while joining,
//!   so a chunk can never be touched after it is released
//! - Dropping the aggregation future drops the `Vec`, which releases whatever
//!   was collected so far
//! - A byte limit turns unbounded bodies into an explicit failure instead of
//!   unbounded memory growth
//! - Trailer frames are dropped; only data contributes to the body

use std::pin::pin;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use tower::BoxError;

/// Failure while reconstructing a response body.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    /// The upstream body stream reported an error.
    #[error("response body stream failed: {0}")]
    Stream(#[source] BoxError),

    /// The body grew past the configured limit.
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// The join of every chunk of one response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedBody {
    bytes: Bytes,
    chunks: usize,
}

impl AggregatedBody {
    /// Number of bytes in the joined body.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of data chunks that were joined, empty chunks included.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Aggregate a streamed body into one buffer of at most `limit` bytes.
///
/// An empty stream yields a zero-length body, never an absence.
pub async fn aggregate<B>(body: B, limit: usize) -> Result<AggregatedBody, AggregationError>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    let mut body = pin!(body);
    let mut chunks: Vec<B::Data> = Vec::new();
    let mut total = 0usize;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| AggregationError::Stream(e.into()))?;
        let Ok(data) = frame.into_data() else {
            continue;
        };

        total = total.saturating_add(data.remaining());
        if total > limit {
            return Err(AggregationError::TooLarge { limit });
        }
        chunks.push(data);
    }

    let count = chunks.len();
    let mut joined = BytesMut::with_capacity(total);
    for chunk in chunks {
        joined.put(chunk);
    }

    Ok(AggregatedBody {
        bytes: joined.freeze(),
        chunks: count,
    })
}
