//! MCP client
//!
//! Interactive and scripted use of the tools over a [`ToolSession`].

pub mod demo;
pub mod dispatch;
pub mod format;
pub mod local;
pub mod parser;
pub mod session;
pub mod stdio;

pub use dispatch::{Dispatcher, LoopState, Outcome};
pub use local::LocalSession;
pub use session::{ToolResult, ToolSession};
pub use stdio::StdioSession;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Write `text` followed by a newline and flush
pub(crate) async fn emit<W>(out: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
