//! Simple MCP Server - Rust Implementation
//!
//! A Model Context Protocol (MCP) server providing a calculator and file
//! tools over stdio.

use clap::{Parser, Subcommand};

use simple_mcp::error::Result;
use simple_mcp::mcp::server::McpServer;
use simple_mcp::mcp::tools::default_registry;

/// Simple MCP Server
#[derive(Parser)]
#[command(name = "simple-mcp-server")]
#[command(author, version, about = "Simple MCP Server - math and file tools over the Model Context Protocol")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool catalog as JSON and exit
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = default_registry()?;

    match cli.command {
        Some(Commands::Tools) => {
            let catalog = serde_json::to_string_pretty(&registry.list_tools())?;
            println!("{}", catalog);
        }
        None => {
            let mut server = McpServer::new(registry);
            server.run_stdio().await?;
        }
    }

    Ok(())
}
