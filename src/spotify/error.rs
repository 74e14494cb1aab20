use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single Spotify Web API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 429. `retry_after` is the `Retry-After` header in seconds, if any.
    #[error("rate limited by Spotify (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<f64> },

    #[error("Spotify API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("request to Spotify failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Failure while exchanging or refreshing an OAuth token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} must be set")]
    MissingConfig(&'static str),

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("token response is missing `{0}`")]
    MissingField(&'static str),

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
