//! MCP server (stdio transport, dispatch, tool execution).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result, ToolError};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, SUPPORTED_PROTOCOL_VERSIONS,
    ServerCapabilities, ServerInfo, Tool, ToolsCapability,
};
use crate::tool::{Arguments, ToolContext, ToolHandler};

/// Default time a single tool call may run.
/// Drive summaries call the model once per file, so this is generous.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Maximum size of one incoming JSON-RPC line (4MB).
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// An MCP server exposing a fixed set of tools.
pub struct Server {
    info: ServerInfo,
    tools: Vec<Arc<dyn ToolHandler>>,
    index: HashMap<String, usize>,
    tool_timeout: Duration,
}

impl Server {
    /// Create a server with no tools.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            tools: Vec::new(),
            index: HashMap::new(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    /// Register a tool. Names must be unique.
    pub fn tool(mut self, handler: impl ToolHandler + 'static) -> Result<Self> {
        let name = handler.definition().name;
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(Arc::new(handler));
        Ok(self)
    }

    /// Override the per-call tool timeout.
    pub fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }

    /// Get the server info.
    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Definitions of all registered tools, in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC on the given streams until `reader`
    /// reaches EOF and every in-flight request has been answered.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!(
            server = %self.info.name,
            tools = self.tools.len(),
            "serving MCP"
        );

        let server = Arc::new(self);
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut in_flight = JoinSet::new();

        loop {
            match read_frame(&mut reader, &mut buf).await? {
                Frame::Eof => break,
                Frame::Oversized => {
                    warn!(limit = MAX_MESSAGE_SIZE, "rejecting oversized message");
                    let error = JsonRpcError::invalid_request(format!(
                        "message exceeds {MAX_MESSAGE_SIZE} bytes"
                    ));
                    let _ = tx.send(JsonRpcResponse::failure(None, error));
                    continue;
                }
                Frame::Message => {}
            }

            let line = match std::str::from_utf8(trim_line_ending(&buf)) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => line.to_owned(),
                Err(e) => {
                    warn!(error = %e, "rejecting message that is not UTF-8");
                    let _ = tx.send(JsonRpcResponse::failure(None, JsonRpcError::parse_error(e)));
                    continue;
                }
            };

            let server = Arc::clone(&server);
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle_line(&line).await {
                    let _ = tx.send(response);
                }
            });

            while in_flight.try_join_next().is_some() {}
        }

        debug!(pending = in_flight.len(), "input closed, draining requests");
        while in_flight.join_next().await.is_some() {}
        drop(tx);

        writer_task
            .await
            .map_err(|e| Error::Writer(e.to_string()))?
    }

    /// Handle one raw JSON-RPC line. Returns `None` for notifications and
    /// for stray responses.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::failure(None, JsonRpcError::parse_error(e)));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::invalid_request(e),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                request.id,
                JsonRpcError::invalid_request(format!("unsupported jsonrpc {}", request.jsonrpc)),
            ));
        }

        let Some(method) = request.method else {
            debug!(id = ?request.id, "ignoring response message");
            return None;
        };

        let Some(id) = request.id else {
            debug!(%method, "notification");
            return None;
        };

        let response = match self.dispatch(id.clone(), &method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                warn!(%method, %error, "request failed");
                JsonRpcResponse::failure(Some(id), error)
            }
        };
        Some(response)
    }

    // --- Internal methods ---

    async fn dispatch(
        &self,
        id: RequestId,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Value, JsonRpcError> {
        debug!(%id, method, "request");
        match method {
            "initialize" => self.initialize(parse_params(params)?),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_value(ListToolsResult {
                tools: self.tools(),
                next_cursor: None,
            }),
            "tools/call" => self.call_tool(id, parse_params(params)?).await,
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: InitializeParams) -> std::result::Result<Value, JsonRpcError> {
        let protocol_version = negotiate_version(&params.protocol_version);
        info!(
            client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            requested = %params.protocol_version,
            protocol_version,
            "initialize"
        );

        to_value(InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
        })
    }

    async fn call_tool(
        &self,
        id: RequestId,
        params: CallToolParams,
    ) -> std::result::Result<Value, JsonRpcError> {
        let handler = self
            .index
            .get(&params.name)
            .map(|&i| Arc::clone(&self.tools[i]))
            .ok_or_else(|| JsonRpcError::invalid_params(format!("unknown tool: {}", params.name)))?;

        let name = params.name;
        let context = ToolContext { request_id: id };
        let arguments = Arguments::from(params.arguments);

        info!(tool = %name, "tool call");
        let mut task = tokio::spawn(async move { handler.call(context, arguments).await });

        let result = match timeout(self.tool_timeout, &mut task).await {
            Err(_) => {
                task.abort();
                warn!(tool = %name, "tool call timed out");
                CallToolResult::error(ToolError::Timeout(self.tool_timeout.as_secs()).to_string())
            }
            Ok(Err(join_error)) if join_error.is_panic() => {
                warn!(tool = %name, "tool handler panicked");
                return Err(JsonRpcError::internal(format!(
                    "panic recovered in {name} tool handler"
                )));
            }
            Ok(Err(join_error)) => return Err(JsonRpcError::internal(join_error)),
            Ok(Ok(Err(tool_error))) => {
                warn!(tool = %name, error = %tool_error, "tool call rejected");
                CallToolResult::error(tool_error.to_string())
            }
            Ok(Ok(Ok(result))) => result,
        };

        to_value(result)
    }
}

fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null)).map_err(JsonRpcError::invalid_params)
}

fn to_value(value: impl serde::Serialize) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(JsonRpcError::internal)
}

enum Frame {
    Eof,
    /// `buf` holds one line, possibly with its line ending.
    Message,
    /// The line was longer than `MAX_MESSAGE_SIZE` and has been skipped.
    Oversized,
}

/// Read one newline-terminated line into `buf` without ever buffering more
/// than `MAX_MESSAGE_SIZE + 1` bytes of it.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_MESSAGE_SIZE as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if read == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() == Some(&b'\n') || (read as u64) < limit {
        return Ok(Frame::Message);
    }

    buf.clear();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                break;
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
    Ok(Frame::Oversized)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let json = serde_json::to_string(&response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
