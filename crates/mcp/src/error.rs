//! MCP error types.

use thiserror::Error;

/// Errors raised by the server itself (transport and registration).
#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("response writer stopped: {0}")]
    Writer(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors a tool handler reports back to the host.
///
/// These never become JSON-RPC errors: the server turns them into a tool
/// result flagged `isError` so the host sees the explanation as text.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("timed out after {0}s")]
    Timeout(u64),
}
