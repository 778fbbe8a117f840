use thiserror::Error;

/// Slack Web API errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack API {method} returned HTTP {status}")]
    Status { method: String, status: u16 },

    #[error("Slack API {method} failed: {error}")]
    Api { method: String, error: String },
}

pub type Result<T> = std::result::Result<T, Error>;
