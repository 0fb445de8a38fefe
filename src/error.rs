//! Error types for the simple MCP server and client
//!
//! This module defines the error hierarchy for all operations in the crate.

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum SimpleMcpError {
    /// Expression evaluation errors
    #[error("Calculation error: {0}")]
    Eval(#[from] EvalError),

    /// Filesystem errors
    #[error("File error: {0}")]
    File(#[from] FileError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// Interactive command errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimpleMcpError {
    /// Whether this error ends the client session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimpleMcpError::Mcp(McpError::Transport { .. }) | SimpleMcpError::Io(_)
        )
    }
}

/// Expression evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown identifier: {name}")]
    UnknownIdentifier { name: String },

    #[error("unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("{name}() takes {expected} argument(s), got {found}")]
    WrongArity {
        name: String,
        expected: String,
        found: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("math domain error in {function}()")]
    Domain { function: String },

    #[error("numeric result out of range")]
    Overflow,

    #[error("expression nested too deeply")]
    TooDeep,
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FileError {
    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("cannot decode {path} as UTF-8: {message}")]
    Decode { path: String, message: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Translate an I/O error for `path` into the matching variant
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied { path },
            std::io::ErrorKind::InvalidData => FileError::Decode {
                path,
                message: err.to_string(),
            },
            _ => FileError::Io { path, source: err },
        }
    }
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },

    #[error("Tool {name} failed: {message}")]
    ToolFailed { name: String, message: String },

    #[error("Server returned error {code}: {message}")]
    Protocol { code: i32, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl McpError {
    pub fn transport(message: impl Into<String>) -> Self {
        McpError::Transport {
            message: message.into(),
        }
    }
}

/// Interactive command errors, recovered locally by the dispatch loop
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: {usage}")]
    MissingArgument { verb: String, usage: String },

    #[error("Usage: {usage}")]
    TooManyArguments { verb: String, usage: String },

    #[error("Unknown command: {verb}")]
    UnknownCommand { verb: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Server command is empty")]
    EmptyServerCommand,
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, SimpleMcpError>;
