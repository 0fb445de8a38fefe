//! MCP tool definitions and handlers
//!
//! Defines the four tools the server exposes and registers them.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{McpError, Result};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::schema::{ParamSpec, ParamType, ToolDescriptor};
use crate::mcp::types::CallToolResult;
use crate::tools::calc::{evaluate, format_number};
use crate::tools::files::{list_dir, read_text, write_text, EntryKind};

/// Build the registry with every tool the server provides
pub fn default_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(
        ToolDescriptor::new(
            "calculate",
            "Perform basic mathematical calculations",
            vec![ParamSpec::required(
                "expression",
                ParamType::String,
                "Mathematical expression to evaluate (e.g., '2 + 3 * 4')",
            )],
        ),
        handle_calculate,
    )?;

    registry.register(
        ToolDescriptor::new(
            "list_files",
            "List files in a directory",
            vec![ParamSpec::optional(
                "directory",
                ParamType::String,
                "Directory path to list files from (defaults to current directory)",
                Some(json!(".")),
            )],
        ),
        handle_list_files,
    )?;

    registry.register(
        ToolDescriptor::new(
            "read_file",
            "Read contents of a text file",
            vec![ParamSpec::required(
                "filepath",
                ParamType::String,
                "Path to the file to read",
            )],
        ),
        handle_read_file,
    )?;

    registry.register(
        ToolDescriptor::new(
            "write_file",
            "Write content to a text file, creating parent directories. The write is not atomic.",
            vec![
                ParamSpec::required("filepath", ParamType::String, "Path to the file to write"),
                ParamSpec::required("content", ParamType::String, "Content to write to the file"),
            ],
        ),
        handle_write_file,
    )?;

    Ok(registry)
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| {
        McpError::InvalidArguments {
            message: e.to_string(),
        }
        .into()
    })
}

// ==================== Tool Handlers ====================

fn handle_calculate(args: Value) -> Result<CallToolResult> {
    #[derive(Deserialize)]
    struct Args {
        expression: String,
    }

    let args: Args = parse_args(args)?;
    let value = evaluate(&args.expression)?;

    info!(expression = %args.expression, "calculated");
    Ok(CallToolResult::text(format!(
        "Result: {} = {}",
        args.expression.trim(),
        format_number(value)
    ))
    .with_structured(json!({ "expression": args.expression, "value": value })))
}

fn handle_list_files(args: Value) -> Result<CallToolResult> {
    #[derive(Deserialize)]
    struct Args {
        directory: String,
    }

    let args: Args = parse_args(args)?;
    let entries = list_dir(&args.directory)?;

    let mut text = format!("Files in {}:\n", args.directory);
    if entries.is_empty() {
        text.push_str("(empty)");
    } else {
        text.push_str(
            &entries
                .iter()
                .map(|e| e.display_line())
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    let structured: Vec<Value> = entries
        .iter()
        .map(|e| {
            let kind = match e.kind {
                EntryKind::Directory => "directory",
                EntryKind::File => "file",
                EntryKind::Other => "other",
            };
            json!({ "name": e.name, "kind": kind })
        })
        .collect();

    Ok(CallToolResult::text(text)
        .with_structured(json!({ "directory": args.directory, "entries": structured })))
}

fn handle_read_file(args: Value) -> Result<CallToolResult> {
    #[derive(Deserialize)]
    struct Args {
        filepath: String,
    }

    let args: Args = parse_args(args)?;
    let content = read_text(&args.filepath)?;

    Ok(CallToolResult::text(format!(
        "Contents of {}:\n\n{}",
        args.filepath, content
    )))
}

fn handle_write_file(args: Value) -> Result<CallToolResult> {
    #[derive(Deserialize)]
    struct Args {
        filepath: String,
        content: String,
    }

    let args: Args = parse_args(args)?;
    let written = write_text(&args.filepath, &args.content)?;

    info!(path = %args.filepath, bytes = written, "wrote file");
    Ok(CallToolResult::text(format!(
        "Successfully wrote {} bytes to {}",
        written, args.filepath
    ))
    .with_structured(json!({ "path": args.filepath, "bytesWritten": written })))
}
