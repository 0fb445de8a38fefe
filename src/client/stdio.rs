//! Stdio session: runs the MCP server as a child process
//!
//! Requests and responses are newline-delimited JSON on the child's stdin and
//! stdout. The child's stderr is forwarded to the log. The child is killed
//! when the session is dropped, so every exit path cleans it up.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::client::session::{ToolResult, ToolSession};
use crate::config::ClientConfig;
use crate::error::{ConfigError, McpError, Result};
use crate::mcp::schema::ToolDescriptor;
use crate::mcp::types::*;

/// Session with a server child process
pub struct StdioSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: i64,
    server_info: Option<Implementation>,
    shutdown_grace: Duration,
}

impl StdioSession {
    /// Launch the configured server and perform the MCP handshake
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let (program, args) = config
            .server_command
            .split_first()
            .ok_or(ConfigError::EmptyServerCommand)?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::transport(format!("failed to launch '{}': {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::transport("failed to open server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::transport("failed to open server stdout"))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        debug!(target: "server", "{}", line.trim_end());
                    }
                }
            });
        }

        let mut session = Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            server_info: None,
            shutdown_grace: config.shutdown_grace,
        };

        session.initialize(config).await?;
        Ok(session)
    }

    /// Server name and version from the handshake
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    async fn initialize(&mut self, config: &ClientConfig) -> Result<()> {
        let params = InitializeParams {
            protocol_version: MCP_VERSION.to_string(),
            client_info: Implementation {
                name: config.client_name.clone(),
                version: config.client_version.clone(),
            },
            capabilities: json!({}),
        };

        let result: InitializeResult = self
            .request(methods::INITIALIZE, Some(serde_json::to_value(params)?))
            .await?;

        info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            protocol = %result.protocol_version,
            "connected to MCP server"
        );
        self.server_info = Some(result.server_info);

        self.send(&JsonRpcRequest::notification(methods::INITIALIZED, None))
            .await
    }

    async fn send(&mut self, message: &JsonRpcRequest) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| McpError::transport("session is closed"))?;

        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::transport(format!("failed to write to server: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| McpError::transport(format!("failed to flush server stdin: {}", e)))?;

        Ok(())
    }

    /// Send a request and wait for the response with the same id
    async fn request<T: DeserializeOwned>(&mut self, method: &str, params: Option<Value>) -> Result<T> {
        let id = self.next_id;
        self.next_id += 1;

        debug!(id, method, "sending request");
        self.send(&JsonRpcRequest::new(RequestId::Number(id), method, params))
            .await?;

        let result = self.read_response(id).await?;
        serde_json::from_value(result).map_err(|e| {
            McpError::transport(format!("malformed {} result: {}", method, e)).into()
        })
    }

    async fn read_response(&mut self, id: i64) -> Result<Value> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| McpError::transport(format!("failed to read from server: {}", e)))?
                .ok_or_else(|| McpError::transport("server closed the connection"))?;

            if line.trim().is_empty() {
                continue;
            }

            let message: Value = serde_json::from_str(&line)
                .map_err(|e| McpError::transport(format!("malformed message from server: {}", e)))?;

            if let Some(method) = message.get("method").and_then(Value::as_str) {
                debug!(method, "ignoring server-initiated message");
                continue;
            }

            let response: JsonRpcResponse = serde_json::from_value(message)
                .map_err(|e| McpError::transport(format!("malformed response: {}", e)))?;

            let matches = response.id == RequestId::Number(id);
            if !matches && response.id != RequestId::Null {
                warn!(expected = id, got = ?response.id, "discarding response for another request");
                continue;
            }

            if let Some(error) = response.error {
                return Err(McpError::Protocol {
                    code: error.code,
                    message: error.message,
                }
                .into());
            }

            if !matches {
                return Err(McpError::transport("response without a request id").into());
            }

            return Ok(response.result.unwrap_or(Value::Null));
        }
    }
}

#[async_trait]
impl ToolSession for StdioSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        let result: ListToolsResult = self.request(methods::LIST_TOOLS, Some(json!({}))).await?;
        Ok(result.tools.iter().map(ToolDescriptor::from_tool).collect())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result: CallToolResult = self
            .request(methods::CALL_TOOL, Some(serde_json::to_value(params)?))
            .await?;
        Ok(result.into())
    }

    async fn close(&mut self) -> Result<()> {
        // Closing stdin is the server's signal to exit
        if self.stdin.take().is_none() {
            return Ok(());
        }

        match tokio::time::timeout(self.shutdown_grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "server exited"),
            Ok(Err(e)) => warn!(error = %e, "failed to wait for server"),
            Err(_) => {
                warn!("server did not exit in time, killing it");
                self.child.kill().await?;
            }
        }

        Ok(())
    }
}
