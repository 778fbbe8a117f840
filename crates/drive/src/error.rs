use std::path::PathBuf;

use thiserror::Error;

/// Google Drive and OAuth errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The OAuth client secret file could not be read.
    #[error("unable to read client secret file {path}: {source}")]
    ReadCredentials {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The OAuth client secret file is not a Google client configuration.
    #[error("unable to parse client secret file: {0}")]
    ParseCredentials(String),

    /// The token file could not be read or written.
    #[error("token file {path}: {source}")]
    TokenStore {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The token file exists but is not a token.
    #[error("invalid token file: {0}")]
    TokenFormat(#[from] serde_json::Error),

    /// The stored token expired and cannot be refreshed.
    #[error("token expired and no refresh token is stored; run `beacon login`")]
    NoRefreshToken,

    /// The authorization flow or token endpoint failed.
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Drive API answered with a non-success status.
    #[error("Drive API {operation} returned {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// Text extraction crashed or could not run.
    #[error("text extraction failed: {0}")]
    Extract(String),
}

impl Error {
    /// Whether this error means we could not obtain credentials, as opposed
    /// to a failing Drive call.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::ReadCredentials { .. }
                | Self::ParseCredentials(_)
                | Self::TokenStore { .. }
                | Self::TokenFormat(_)
                | Self::NoRefreshToken
                | Self::Auth(_)
        ) || matches!(self, Self::Api { status: 401, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
