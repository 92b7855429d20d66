//! Centralized error types for redhelm.

use thiserror::Error;

use crate::reply::ReplyError;

/// Main error type for redhelm operations.
#[derive(Error, Debug)]
pub enum RedhelmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Rate limited by the model provider after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },

    #[error("Model request failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<RedhelmError>,
    },

    #[error("Model returned no text content")]
    EmptyResponse,

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

/// Result type for redhelm operations.
pub type RedhelmResult<T> = Result<T, RedhelmError>;

impl RedhelmError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether another attempt at the same request may succeed.
    ///
    /// Transport failures (including a body cut off mid-read), HTTP 429 and
    /// HTTP 5xx are transient; everything else (auth failures, bad requests,
    /// undecodable envelopes) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Api { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Whether this is a provider rate-limit response.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::Api { status: 429, .. })
    }
}
