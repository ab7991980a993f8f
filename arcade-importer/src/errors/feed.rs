use cos::CosError;
use thiserror::Error;

/// Errors raised while listing or fetching feed entries.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The provider asked us to slow down. The run is truncated and resumed
    /// by the next invocation.
    #[error("Rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("Document changed while importing: {0}")]
    DocumentChanged(String),

    #[error("Bucket error: {0}")]
    Bucket(#[from] CosError),

    #[error("Invalid entry pattern: {0}")]
    Pattern(#[from] regex::Error),
}
