//! Simple MCP Client
//!
//! Launches the MCP server as a child process and either runs a scripted
//! demo or an interactive session against its tools.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use simple_mcp::client::demo::{run_demo, DEMO_FILE};
use simple_mcp::client::{Dispatcher, LocalSession, StdioSession, ToolSession};
use simple_mcp::config::ClientConfig;
use simple_mcp::mcp::tools::default_registry;

/// Simple MCP Client
#[derive(Parser)]
#[command(name = "simple-mcp-client")]
#[command(author, version, about = "Simple MCP Client - drive the simple MCP server's tools")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Server command line to launch instead of the default
    #[arg(long, global = true, value_name = "CMD")]
    server: Option<String>,

    /// Run the tools in-process instead of launching a server
    #[arg(long, global = true, conflicts_with = "server")]
    local: bool,
}

#[derive(Subcommand)]
enum Mode {
    /// Run a fixed demonstration of every tool
    Demo {
        /// File the demo writes and reads back
        #[arg(long, default_value = DEMO_FILE)]
        file: String,
    },
    /// Start an interactive session
    Interactive,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::new();
    if let Some(command) = &cli.server {
        config = config
            .with_server_command(command)
            .context("invalid --server command")?;
    }

    if cli.local {
        let registry = default_registry().context("failed to build tool registry")?;
        return run_mode(LocalSession::new(registry), cli.mode, &config).await;
    }

    println!(
        "Connecting to server with command: {}",
        config.server_command_line()
    );
    let session = StdioSession::connect(&config)
        .await
        .context("failed to connect to MCP server")?;

    run_mode(session, cli.mode, &config).await
}

async fn run_mode<S: ToolSession>(mut session: S, mode: Mode, config: &ClientConfig) -> Result<()> {
    match mode {
        Mode::Demo { file } => {
            let mut stdout = tokio::io::stdout();
            let outcome = run_demo(&mut session, &file, &mut stdout).await;
            let closed = session.close().await;
            outcome.context("demo failed")?;
            closed.context("failed to shut down session")?;
        }
        Mode::Interactive => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();
            Dispatcher::new(session)
                .with_prompt(config.prompt.clone())
                .run(stdin, stdout)
                .await
                .context("interactive session ended")?;
        }
    }

    Ok(())
}
