use clvp_core::DomError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("no picker instance with id {0}")]
    UnknownInstance(String),
}

impl StorefrontError {
    /// `true` for a missing document anchor, which aborts a navigation
    /// loudly instead of being treated as a network failure.
    #[must_use]
    pub fn is_missing_anchor(&self) -> bool {
        matches!(self, StorefrontError::Dom(DomError::MissingAnchor { .. }))
    }
}
