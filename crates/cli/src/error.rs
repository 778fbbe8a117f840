//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required secret is missing from the environment.
    #[error("{var} is not set; export it before starting beacon")]
    MissingSecret { var: &'static str },

    /// Configuration is invalid or unreadable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the MCP server.
    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    /// An error occurred talking to Slack.
    #[error(transparent)]
    Slack(#[from] slack::Error),

    /// An error occurred in Google authorization or Drive access.
    #[error(transparent)]
    Drive(#[from] drive::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
