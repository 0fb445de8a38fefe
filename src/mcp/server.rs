//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::server::{SERVER_NAME, SERVER_VERSION};
use crate::error::Result;
use crate::mcp::registry::ToolRegistry;
use crate::mcp::types::*;

/// MCP Server exposing a tool registry
pub struct McpServer {
    /// Tool registry
    registry: ToolRegistry,

    /// Whether the client sent `notifications/initialized`
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC until the reader reaches EOF
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = self.registry.len(), "MCP server ready");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line) {
                let mut response_str = serde_json::to_string(&response)?;
                response_str.push('\n');
                writer.write_all(response_str.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("client closed the connection");
        Ok(())
    }

    /// Handle an incoming JSON-RPC message
    pub fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable message");
                return Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::invalid_request(e.to_string()),
                ));
            }
        };

        debug!(method = %request.method, "received");

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        let response = match request.method.as_str() {
            methods::INITIALIZE => match self.handle_initialize(&request) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
            },
            methods::PING => JsonRpcResponse::success(id, serde_json::json!({})),
            methods::LIST_TOOLS => {
                let result = ListToolsResult {
                    tools: self.registry.list_tools(),
                };
                match serde_json::to_value(result) {
                    Ok(v) => JsonRpcResponse::success(id, v),
                    Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
                }
            }
            methods::CALL_TOOL => self.handle_call_tool(id, &request),
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found(&request.method)),
        };

        Some(response)
    }

    fn handle_notification(&mut self, request: &JsonRpcRequest) {
        if request.method == methods::INITIALIZED {
            self.initialized = true;
            info!("client initialized");
        } else {
            debug!(method = %request.method, "ignoring notification");
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, request: &JsonRpcRequest) -> Result<Value> {
        if let Some(params) = &request.params {
            match serde_json::from_value::<InitializeParams>(params.clone()) {
                Ok(p) => info!(
                    client = %p.client_info.name,
                    version = %p.client_info.version,
                    protocol = %p.protocol_version,
                    "initialize"
                ),
                Err(e) => debug!(error = %e, "initialize without recognizable params"),
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    fn handle_call_tool(&self, id: RequestId, request: &JsonRpcRequest) -> JsonRpcResponse {
        let params: CallToolParams = match request.params.as_ref() {
            Some(p) => match serde_json::from_value(p.clone()) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid tool parameters: {}", e)),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing tool parameters"),
                );
            }
        };

        let result = self.registry.call_tool(&params.name, params.arguments);
        match serde_json::to_value(result) {
            Ok(v) => JsonRpcResponse::success(id, v),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::default_registry;
    use serde_json::json;

    fn server() -> McpServer {
        McpServer::new(default_registry().unwrap())
    }

    fn request(id: i64, method: &str, params: Value) -> String {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
    }

    #[test]
    fn test_initialize() {
        let resp = server()
            .handle_message(&request(1, "initialize", json!({
                "protocolVersion": MCP_VERSION,
                "clientInfo": {"name": "test", "version": "0"},
                "capabilities": {}
            })))
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_initialized_notification() {
        let mut server = server();
        let resp = server.handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
        assert!(resp.is_none());
        assert!(server.is_initialized());
    }

    #[test]
    fn test_parse_error() {
        let resp = server().handle_message("{not json").unwrap();
        assert_eq!(resp.id, RequestId::Null);
        assert_eq!(resp.error.unwrap().code, -32700);
    }

    #[test]
    fn test_null_id_gets_a_response() {
        let resp = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#)
            .unwrap();
        assert_eq!(resp.id, RequestId::Null);
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_unknown_method() {
        let resp = server().handle_message(&request(7, "resources/list", json!({}))).unwrap();
        assert_eq!(resp.id, RequestId::Number(7));
        assert_eq!(resp.error.unwrap().code, -32601);
    }

    #[test]
    fn test_call_tool_without_params() {
        let msg = json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call"}).to_string();
        let resp = server().handle_message(&msg).unwrap();
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[test]
    fn test_list_and_call() {
        let mut server = server();
        let resp = server.handle_message(&request(2, "tools/list", json!({}))).unwrap();
        assert_eq!(resp.result.unwrap()["tools"].as_array().unwrap().len(), 4);

        let resp = server
            .handle_message(&request(
                3,
                "tools/call",
                json!({"name": "calculate", "arguments": {"expression": "sqrt(16)"}}),
            ))
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["text"], "Result: sqrt(16) = 4");
        assert!(result.get("isError").is_none());
    }
}
