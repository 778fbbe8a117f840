//! MCP (Model Context Protocol) server library.
//!
//! This crate exposes a set of tools to an assistant host over stdio, using
//! newline-delimited JSON-RPC 2.0.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use mcp::{Arguments, CallToolResult, Server, Tool, ToolContext, ToolError, ToolHandler};
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl ToolHandler for Greet {
//!     fn definition(&self) -> Tool {
//!         Tool::new("greet", "Say hello.").with_required_string("name", "Who to greet.")
//!     }
//!
//!     async fn call(&self, _ctx: ToolContext, args: Arguments) -> Result<CallToolResult, ToolError> {
//!         let name = args.require_str("name")?;
//!         Ok(CallToolResult::text(format!("Hello, {name}!")))
//!     }
//! }
//!
//! # async fn example() -> mcp::Result<()> {
//! Server::new("greeter", "1.0.0").tool(Greet)?.serve_stdio().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod protocol;
mod server;
mod tool;

pub use error::{Error, Result, ToolError};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, SUPPORTED_PROTOCOL_VERSIONS,
    ServerCapabilities, ServerInfo, Tool, ToolContent,
};
pub use server::{DEFAULT_TOOL_TIMEOUT, MAX_MESSAGE_SIZE, Server};
pub use tool::{Arguments, ToolContext, ToolHandler};
