//! Tool implementations
//!
//! The arithmetic evaluator and filesystem accessors behind the MCP tools.

pub mod calc;
pub mod files;
