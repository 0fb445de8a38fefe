//! In-process session: calls a tool registry directly, without a server
//! process or JSON-RPC framing.

use async_trait::async_trait;
use serde_json::Value;

use crate::client::session::{ToolResult, ToolSession};
use crate::error::{McpError, Result};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::schema::ToolDescriptor;

pub struct LocalSession {
    registry: ToolRegistry,
    closed: bool,
}

impl LocalSession {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(McpError::transport("session is closed").into());
        }
        Ok(())
    }
}

#[async_trait]
impl ToolSession for LocalSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        self.ensure_open()?;
        Ok(self.registry.descriptors().cloned().collect())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResult> {
        self.ensure_open()?;
        Ok(self.registry.call_tool(name, arguments).into())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
