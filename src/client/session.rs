//! Client session abstraction
//!
//! The dispatch loop talks to tools through [`ToolSession`], implemented by
//! the stdio process session and by the in-process session.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::mcp::schema::ToolDescriptor;
use crate::mcp::types::CallToolResult;

/// Outcome of a tool call as seen by the client
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// The tool ran; text content plus optional structured value
    Success {
        text: String,
        structured: Option<Value>,
    },

    /// The tool reported an error
    Failure { message: String },
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }
}

impl From<CallToolResult> for ToolResult {
    fn from(result: CallToolResult) -> Self {
        let text = result.joined_text();
        if result.is_error {
            ToolResult::Failure { message: text }
        } else {
            ToolResult::Success {
                text,
                structured: result.structured_content,
            }
        }
    }
}

/// An open connection to a set of tools
#[async_trait]
pub trait ToolSession: Send {
    /// Discover the available tools
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool and wait for its result
    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResult>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_call_tool_result() {
        let ok = ToolResult::from(CallToolResult::text("done").with_structured(json!({"n": 1})));
        assert_eq!(
            ok,
            ToolResult::Success {
                text: "done".to_string(),
                structured: Some(json!({"n": 1})),
            }
        );

        let failed = ToolResult::from(CallToolResult::error("nope"));
        assert!(!failed.is_success());
        assert_eq!(
            failed,
            ToolResult::Failure {
                message: "Error: nope".to_string()
            }
        );
    }
}
