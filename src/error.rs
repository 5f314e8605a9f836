use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Unauthorized - credential rejected by {0}")]
    Unauthorized(String),

    #[error("Rate limited (429)")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Deserialization error: {0}")]
    Deserialize(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Aggregation error: {0}")]
    Aggregate(String),
}

impl Error {
    /// True when the upstream service rejected the credential itself.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Error::Unauthorized(_) => true,
            Error::Api { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// True for 429s (and 403s that carry rate-limit headers), which are retried.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Deserialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
