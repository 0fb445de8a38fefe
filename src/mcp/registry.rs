//! Tool registry
//!
//! Maps tool names to their descriptor and handler. Built once at startup;
//! names are unique and listing preserves registration order.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{McpError, Result};
use crate::mcp::schema::ToolDescriptor;
use crate::mcp::types::{CallToolResult, Tool};

/// Handler for a tool call. Receives the arguments with defaults applied.
pub type ToolFn = fn(Value) -> Result<CallToolResult>;

/// A registered tool
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    handler: ToolFn,
}

/// Registry of callable tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; fails if the name is already taken
    pub fn register(&mut self, descriptor: ToolDescriptor, handler: ToolFn) -> Result<()> {
        if self.index.contains_key(&descriptor.name) {
            return Err(McpError::DuplicateTool {
                name: descriptor.name,
            }
            .into());
        }

        debug!(tool = %descriptor.name, "registered tool");
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { descriptor, handler });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    /// Wire definitions of all tools
    pub fn list_tools(&self) -> Vec<Tool> {
        self.descriptors().map(ToolDescriptor::to_tool).collect()
    }

    /// Call a tool by name.
    ///
    /// Every failure, including an unknown tool or bad arguments, comes back
    /// as an error result rather than an `Err`.
    pub fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "call to unknown tool");
            return CallToolResult::error(McpError::UnknownTool { name: name.to_string() }.to_string());
        };

        let args = match prepare_arguments(&tool.descriptor, args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(e.to_string()),
        };

        debug!(tool = %name, "calling tool");
        match (tool.handler)(args) {
            Ok(result) => result,
            Err(e) => {
                debug!(tool = %name, error = %e, "tool failed");
                CallToolResult::error(e.to_string())
            }
        }
    }
}

/// Check argument types against the descriptor and fill in defaults
fn prepare_arguments(descriptor: &ToolDescriptor, args: Value) -> std::result::Result<Value, McpError> {
    let mut map = match args {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(McpError::InvalidArguments {
                message: format!("expected an object, got {}", other),
            })
        }
    };

    for param in &descriptor.params {
        match map.get(&param.name) {
            Some(value) if !value.is_null() => {
                if !param.param_type.accepts(value) {
                    return Err(McpError::InvalidArguments {
                        message: format!("'{}' must be a {}", param.name, param.param_type),
                    });
                }
            }
            _ => {
                if let Some(default) = &param.default {
                    map.insert(param.name.clone(), default.clone());
                } else if !param.optional {
                    return Err(McpError::InvalidArguments {
                        message: format!("missing required parameter '{}'", param.name),
                    });
                }
            }
        }
    }

    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::schema::{ParamSpec, ParamType};
    use serde_json::json;

    fn echo(args: Value) -> Result<CallToolResult> {
        Ok(CallToolResult::text(args["word"].as_str().unwrap_or_default().to_string()))
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new(
                    "echo",
                    "Echo a word",
                    vec![ParamSpec::optional(
                        "word",
                        ParamType::String,
                        "Word to echo",
                        Some(json!("hi")),
                    )],
                ),
                echo,
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = registry();
        let err = registry
            .register(ToolDescriptor::new("echo", "again", vec![]), echo)
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_defaults_applied() {
        let result = registry().call_tool("echo", json!({}));
        assert!(!result.is_error);
        assert_eq!(result.joined_text(), "hi");

        let result = registry().call_tool("echo", Value::Null);
        assert_eq!(result.joined_text(), "hi");
    }

    #[test]
    fn test_type_mismatch_is_error_result() {
        let result = registry().call_tool("echo", json!({"word": 5}));
        assert!(result.is_error);
        assert!(result.joined_text().contains("must be a string"));
    }

    #[test]
    fn test_unknown_tool_is_error_result() {
        let result = registry().call_tool("frobnicate", json!({}));
        assert!(result.is_error);
        assert!(result.joined_text().contains("Unknown tool: frobnicate"));
    }
}
