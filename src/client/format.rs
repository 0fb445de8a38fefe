//! Display formatting for the client

use crate::client::session::ToolResult;
use crate::mcp::schema::ToolDescriptor;

/// Format the tool catalog
pub fn format_tools(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "=== Available Tools ===\n(none)".to_string();
    }

    let mut output = String::from("=== Available Tools ===\n");
    for tool in tools {
        output.push_str(&format!("• {}: {}\n", tool.name, tool.description));
        output.push_str(&format!("    {}\n", tool.signature()));
    }
    output.trim_end().to_string()
}

/// Format a tool result for display.
///
/// Text wins; a result carrying only structured content is pretty-printed.
pub fn format_result(result: &ToolResult) -> String {
    match result {
        ToolResult::Success { text, structured } => {
            if !text.is_empty() {
                text.clone()
            } else if let Some(value) = structured {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            } else {
                "No content returned".to_string()
            }
        }
        ToolResult::Failure { message } if message.is_empty() => "Error: tool failed".to_string(),
        ToolResult::Failure { message } => message.clone(),
    }
}
