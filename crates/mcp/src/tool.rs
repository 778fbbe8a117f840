//! Tool handler trait and call arguments.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::protocol::{CallToolResult, RequestId, Tool};

/// Per-call context handed to a tool handler.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Id of the `tools/call` request being served.
    pub request_id: RequestId,
}

/// Arguments of a `tools/call` request.
#[derive(Debug, Clone, Default)]
pub struct Arguments(pub Map<String, Value>);

impl Arguments {
    /// Get a required string argument.
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Err(ToolError::MissingArgument(name.to_string())),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(ToolError::InvalidArgument {
                name: name.to_string(),
                reason: format!("expected a string, got {other}"),
            }),
        }
    }
}

impl From<Option<Map<String, Value>>> for Arguments {
    fn from(map: Option<Map<String, Value>>) -> Self {
        Self(map.unwrap_or_default())
    }
}

/// A tool the server exposes to the host.
///
/// Handlers are stored as trait objects, hence `async_trait` rather than
/// `impl Future` returns.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and input schema announced in `tools/list`.
    fn definition(&self) -> Tool;

    /// Run the tool.
    async fn call(&self, context: ToolContext, arguments: Arguments)
    -> Result<CallToolResult, ToolError>;
}
