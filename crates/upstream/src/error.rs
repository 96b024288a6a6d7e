//! Typed error enum for the upstream crate.

use thiserror::Error;

/// Errors from the sessions API. None of them are retried: a failed fetch
/// fails the form it belongs to.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("HTTP status {code}: {body}")]
    HttpStatus { code: u16, body: String },
    #[error("JSON parse error in {context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("pagination loop: cursor {cursor} returned twice")]
    PaginationLoop { cursor: String },
    #[error("client initialization failed: {0}")]
    ClientInit(String),
}
