//! Simple MCP Library
//!
//! A Model Context Protocol (MCP) server exposing a calculator and basic
//! file tools, and a client that drives them interactively or from a script.

pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;

pub use config::ClientConfig;
pub use error::{Result, SimpleMcpError};
