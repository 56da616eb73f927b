//! Error types for netfeeds.

use thiserror::Error;

/// Errors raised while fetching or decoding a single source.
///
/// These are source-local: the drivers log them and move on to the next
/// source instead of aborting the run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{url}: HTTP {status}")]
    Status { url: String, status: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{url}: response too large ({size} bytes, max {max} bytes)")]
    TooLarge { url: String, size: usize, max: usize },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid session token: {0:?}")]
    InvalidToken(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}

impl From<serde_yaml::Error> for FetchError {
    fn from(e: serde_yaml::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}
