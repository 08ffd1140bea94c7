//! Error types for talking to the Spotify Web API.
//!
//! Every variant aborts the aggregation run it occurs in. Rate limiting
//! (HTTP 429) is handled by the pager and never surfaces here.

use std::time::Duration;
use thiserror::Error;

/// Failures of the API client, the pager and the aggregator.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A non-success, non-429 HTTP response.
    #[error("request failed with HTTP {status}: {body}")]
    FetchFailed { status: u16, body: String },

    /// A response or page item that does not match the expected shape.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The request never produced a response (connect, TLS, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The caller-level deadline around an aggregation run expired.
    #[error("aggregation timed out after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// HTTP status carried by a `FetchFailed` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::FetchFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Transport(format!("request timed out: {e}"))
        } else if e.is_connect() {
            ApiError::Transport(format!("cannot connect: {e}"))
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::MalformedRecord(e.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
