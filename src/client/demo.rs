//! Scripted demonstration of every tool

use serde_json::{json, Value};
use tokio::io::AsyncWrite;
use tracing::info;

use crate::client::emit;
use crate::client::format::format_tools;
use crate::client::session::{ToolResult, ToolSession};
use crate::error::{McpError, Result};

/// Expressions evaluated by the demo
pub const DEMO_EXPRESSIONS: &[&str] = &["2 + 3 * 4", "sqrt(16)", "pi * 2", "sin(pi/2)"];

/// Content written to and read back from the demo file
pub const DEMO_CONTENT: &str = "Hello from MCP Client!\nThis is a test file.";

/// Default demo file, relative to the server's working directory
pub const DEMO_FILE: &str = "test_file.txt";

/// Call a tool, turning a tool failure into an error
async fn step<S>(session: &mut S, tool: &str, arguments: Value) -> Result<String>
where
    S: ToolSession + ?Sized,
{
    match session.call_tool(tool, arguments).await? {
        ToolResult::Success { text, .. } => Ok(text),
        ToolResult::Failure { message } => Err(McpError::ToolFailed {
            name: tool.to_string(),
            message,
        }
        .into()),
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the demo script, stopping at the first failure.
///
/// Does not close the session.
pub async fn run_demo<S, W>(session: &mut S, file: &str, out: &mut W) -> Result<()>
where
    S: ToolSession + ?Sized,
    W: AsyncWrite + Unpin,
{
    let tools = session.list_tools().await?;
    emit(out, &format!("\n{}", format_tools(&tools))).await?;

    emit(out, "\n=== MCP Client Demo ===").await?;

    emit(out, "\n1. Mathematical calculations:").await?;
    for expr in DEMO_EXPRESSIONS {
        let text = step(session, "calculate", json!({ "expression": expr })).await?;
        emit(out, &format!("  {} => {}", expr, text)).await?;
    }

    emit(out, "\n2. File operations:").await?;

    let listing = step(session, "list_files", json!({ "directory": "." })).await?;
    emit(out, &format!("  Current directory contents:\n{}", indent(&listing))).await?;

    let written = step(
        session,
        "write_file",
        json!({ "filepath": file, "content": DEMO_CONTENT }),
    )
    .await?;
    emit(out, &format!("  Write result: {}", written)).await?;

    let read = step(session, "read_file", json!({ "filepath": file })).await?;
    emit(out, &format!("  Read result:\n{}", indent(&read))).await?;

    if !read.ends_with(DEMO_CONTENT) {
        return Err(McpError::ToolFailed {
            name: "read_file".to_string(),
            message: format!("{} did not contain what was written", file),
        }
        .into());
    }

    info!("demo finished");
    emit(out, "\nDemo completed!").await?;
    Ok(())
}
