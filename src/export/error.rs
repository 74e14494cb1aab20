use thiserror::Error;

use crate::spotify::ApiError;

/// Terminal failure of an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// `GET /me` answered without a usable `id`.
    #[error("Failed to fetch current user from Spotify; verify authentication.")]
    Identity,

    #[error(transparent)]
    Remote(#[from] ApiError),

    #[error("still rate limited at offset {offset} after {attempts} attempts")]
    RateLimitExhausted { offset: u32, attempts: u32 },
}
