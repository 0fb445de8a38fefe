//! Configuration for the simple MCP server and client
//!
//! Nothing is read from files or the environment; the client is configured
//! from its command line.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::parser::tokenize;
use crate::error::{ConfigError, Result};

/// Configuration for the MCP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Program and arguments used to launch the server
    pub server_command: Vec<String>,

    /// Name reported to the server during initialization
    pub client_name: String,

    /// Version reported to the server during initialization
    pub client_version: String,

    /// Interactive prompt
    pub prompt: String,

    /// How long to wait for the server to exit after closing its stdin
    pub shutdown_grace: Duration,
}

impl ClientConfig {
    /// Create a configuration that launches the default server
    pub fn new() -> Self {
        Self {
            server_command: Self::default_server_command(),
            client_name: client::CLIENT_NAME.to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            prompt: client::PROMPT.to_string(),
            shutdown_grace: Duration::from_millis(client::SHUTDOWN_GRACE_MS),
        }
    }

    /// Replace the server command with a command line.
    ///
    /// The line is split like interactive input, so quoting works:
    /// `--server "python3 'my server.py'"`.
    pub fn with_server_command(mut self, command_line: &str) -> Result<Self> {
        let command = tokenize(command_line);
        if command.is_empty() {
            return Err(ConfigError::EmptyServerCommand.into());
        }
        self.server_command = command;
        Ok(self)
    }

    /// The server binary installed next to this executable, else the one on PATH
    pub fn default_server_command() -> Vec<String> {
        let file_name = format!("{}{}", server::BINARY_NAME, std::env::consts::EXE_SUFFIX);

        let sibling: Option<PathBuf> = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
            .filter(|path| path.is_file());

        match sibling {
            Some(path) => vec![path.display().to_string()],
            None => vec![file_name],
        }
    }

    /// Server command as a single display string
    pub fn server_command_line(&self) -> String {
        self.server_command.join(" ")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Server constants
pub mod server {
    /// Name reported in `serverInfo`
    pub const SERVER_NAME: &str = "simple-mcp-server";

    /// Version reported in `serverInfo`
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Binary name of the server
    pub const BINARY_NAME: &str = "simple-mcp-server";
}

/// Client constants
pub mod client {
    pub const CLIENT_NAME: &str = "simple-mcp-client";

    pub const PROMPT: &str = "mcp> ";

    pub const SHUTDOWN_GRACE_MS: u64 = 2000;
}
