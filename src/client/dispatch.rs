//! Interactive dispatch loop
//!
//! Resolves each parsed line to a local action or a tool call, issues at most
//! one call at a time, and formats the result. Only transport failures end
//! the loop; everything else is reported and the loop keeps going.

use std::future::{pending, Future};

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::client::emit;
use crate::client::format::{format_result, format_tools};
use crate::client::parser::ParsedCommand;
use crate::client::session::ToolSession;
use crate::config::client::PROMPT;
use crate::error::{CommandError, McpError, Result};
use crate::mcp::schema::ToolDescriptor;

const BANNER: &str = "\n=== Interactive MCP Client Session ===\nType 'help' for available commands, 'quit' to exit";

/// Interactive commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Help,
    Tools,
    Calc,
    List,
    Read,
    Write,
    Quit,
}

struct VerbSpec {
    verb: Verb,
    names: &'static [&'static str],
    usage: &'static str,
    summary: &'static str,
}

const VERBS: &[VerbSpec] = &[
    VerbSpec {
        verb: Verb::Help,
        names: &["help", "h", "?"],
        usage: "help",
        summary: "Show this help message",
    },
    VerbSpec {
        verb: Verb::Tools,
        names: &["tools"],
        usage: "tools",
        summary: "List available tools",
    },
    VerbSpec {
        verb: Verb::Calc,
        names: &["calc", "calculate"],
        usage: "calc <expr>",
        summary: "Calculate mathematical expression",
    },
    VerbSpec {
        verb: Verb::List,
        names: &["ls", "list", "dir"],
        usage: "ls [directory]",
        summary: "List files in directory",
    },
    VerbSpec {
        verb: Verb::Read,
        names: &["read", "cat"],
        usage: "read <filepath>",
        summary: "Read file contents",
    },
    VerbSpec {
        verb: Verb::Write,
        names: &["write"],
        usage: "write <file> <content>",
        summary: "Write content to file (quote content with spaces)",
    },
    VerbSpec {
        verb: Verb::Quit,
        names: &["quit", "exit", "q"],
        usage: "quit",
        summary: "Exit the client",
    },
];

impl Verb {
    /// Case-insensitive lookup by name or alias
    pub fn lookup(word: &str) -> Option<Verb> {
        let word = word.to_lowercase();
        VERBS
            .iter()
            .find(|spec| spec.names.contains(&word.as_str()))
            .map(|spec| spec.verb)
    }

    fn usage(self) -> &'static str {
        VERBS
            .iter()
            .find(|spec| spec.verb == self)
            .map(|spec| spec.usage)
            .unwrap_or_default()
    }
}

/// Help text listing every command
pub fn help_text() -> String {
    let mut text = String::from("=== Available Commands ===\n");
    for spec in VERBS {
        text.push_str(&format!("{:<24}- {}\n", spec.usage, spec.summary));
    }
    text.push_str("\nExample: write hello.txt \"Hello, World!\"");
    text
}

/// A remote tool call with typed arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub tool: &'static str,
    pub arguments: Value,
}

/// What a parsed line asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Help,
    Tools,
    Quit,
    Call(Invocation),
}

/// Map a parsed command to an action, coercing positional arguments
pub fn resolve(cmd: &ParsedCommand) -> std::result::Result<Action, CommandError> {
    let verb = Verb::lookup(&cmd.verb).ok_or_else(|| CommandError::UnknownCommand {
        verb: cmd.verb.clone(),
    })?;

    let missing = || CommandError::MissingArgument {
        verb: cmd.verb.to_lowercase(),
        usage: verb.usage().to_string(),
    };
    let too_many = || CommandError::TooManyArguments {
        verb: cmd.verb.to_lowercase(),
        usage: verb.usage().to_string(),
    };

    let invocation = match verb {
        Verb::Help => return Ok(Action::Help),
        Verb::Tools => return Ok(Action::Tools),
        Verb::Quit => return Ok(Action::Quit),
        Verb::Calc => {
            if cmd.rest.is_empty() {
                return Err(missing());
            }
            Invocation {
                tool: "calculate",
                arguments: json!({ "expression": cmd.rest }),
            }
        }
        Verb::List => {
            if cmd.args.len() > 1 {
                return Err(too_many());
            }
            let directory = cmd.args.first().map(String::as_str).unwrap_or(".");
            Invocation {
                tool: "list_files",
                arguments: json!({ "directory": directory }),
            }
        }
        Verb::Read => match cmd.args.as_slice() {
            [] => return Err(missing()),
            [path] => Invocation {
                tool: "read_file",
                arguments: json!({ "filepath": path }),
            },
            _ => return Err(too_many()),
        },
        Verb::Write => match cmd.args.as_slice() {
            [path, content @ ..] if !content.is_empty() => Invocation {
                tool: "write_file",
                arguments: json!({ "filepath": path, "content": content.join(" ") }),
            },
            _ => return Err(missing()),
        },
    };

    Ok(Action::Call(invocation))
}

/// Dispatch loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    AwaitingResponse,
    Closed,
}

/// Result of dispatching one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to show the user
    Output(String),
    /// Nothing to show (blank line)
    Silent,
    /// The user asked to leave; the session is closed
    Quit,
}

/// Interactive dispatcher over a tool session
pub struct Dispatcher<S> {
    session: S,
    state: LoopState,
    tools: Vec<ToolDescriptor>,
    prompt: String,
}

impl<S: ToolSession> Dispatcher<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            state: LoopState::Idle,
            tools: Vec::new(),
            prompt: PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Tools seen at the last refresh
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn into_session(self) -> S {
        self.session
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == LoopState::Closed {
            return Err(McpError::transport("session is closed").into());
        }
        Ok(())
    }

    fn settle<T>(&mut self, result: &Result<T>) {
        self.state = match result {
            Err(e) if e.is_fatal() => LoopState::Closed,
            _ => LoopState::Idle,
        };
    }

    /// Fetch the tool list from the session into the cache
    pub async fn refresh_tools(&mut self) -> Result<()> {
        self.refresh_tools_until(pending()).await
    }

    async fn refresh_tools_until<F>(&mut self, interrupt: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.ensure_open()?;
        self.state = LoopState::AwaitingResponse;
        let result = interruptible(self.session.list_tools(), interrupt).await;
        self.settle(&result);

        self.tools = result?;
        Ok(())
    }

    /// Dispatch one line of input.
    ///
    /// Returns `Err` only for fatal transport errors, after which the
    /// dispatcher is closed.
    pub async fn dispatch(&mut self, line: &str) -> Result<Outcome> {
        self.dispatch_until(line, pending()).await
    }

    /// Dispatch one line, abandoning the session if `interrupt` completes
    /// while a response is pending
    pub async fn dispatch_until<F>(&mut self, line: &str, interrupt: F) -> Result<Outcome>
    where
        F: Future<Output = ()>,
    {
        self.ensure_open()?;

        let Some(cmd) = ParsedCommand::parse(line) else {
            return Ok(Outcome::Silent);
        };

        let action = match resolve(&cmd) {
            Ok(action) => action,
            Err(e @ CommandError::UnknownCommand { .. }) => {
                debug!(verb = %cmd.verb, "unknown command");
                return Ok(Outcome::Output(format!(
                    "{}\nType 'help' for available commands",
                    e
                )));
            }
            Err(e) => return Ok(Outcome::Output(e.to_string())),
        };

        match action {
            Action::Help => Ok(Outcome::Output(help_text())),
            Action::Quit => {
                self.close().await?;
                Ok(Outcome::Quit)
            }
            Action::Tools => match self.refresh_tools_until(interrupt).await {
                Ok(()) => Ok(Outcome::Output(format_tools(&self.tools))),
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => Ok(Outcome::Output(format!("Error: {}", e))),
            },
            Action::Call(invocation) => {
                debug!(tool = invocation.tool, "dispatching");
                self.state = LoopState::AwaitingResponse;
                let result = interruptible(
                    self.session.call_tool(invocation.tool, invocation.arguments),
                    interrupt,
                )
                .await;
                self.settle(&result);

                match result {
                    Ok(result) => Ok(Outcome::Output(format_result(&result))),
                    Err(e) if e.is_fatal() => Err(e),
                    Err(e) => Ok(Outcome::Output(format!("Error: {}", e))),
                }
            }
        }
    }

    /// Close the session; the dispatcher accepts no further input
    pub async fn close(&mut self) -> Result<()> {
        self.state = LoopState::Closed;
        self.session.close().await
    }

    /// Run the read-dispatch-print loop until `quit`, EOF, or a transport
    /// failure. The session is closed on every path.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.repl(input, &mut output).await;
        let closed = self.close().await;
        result.and(closed)
    }

    async fn repl<R, W>(&mut self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match self.refresh_tools_until(interrupted()).await {
            Ok(()) => emit(output, &format!("\n{}", format_tools(&self.tools))).await?,
            Err(e) if e.is_fatal() => {
                emit(output, &format!("Fatal: {}", e)).await?;
                return Err(e);
            }
            Err(e) => emit(output, &format!("Failed to list tools: {}", e)).await?,
        }
        emit(output, BANNER).await?;

        let mut lines = input.lines();
        loop {
            output.write_all(format!("\n{}", self.prompt).as_bytes()).await?;
            output.flush().await?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    emit(output, "\nUse 'quit' to exit").await?;
                    continue;
                }
            };

            let Some(line) = line else {
                debug!("end of input");
                emit(output, "").await?;
                return Ok(());
            };

            match self.dispatch_until(&line, interrupted()).await {
                Ok(Outcome::Output(text)) => emit(output, &text).await?,
                Ok(Outcome::Silent) => {}
                Ok(Outcome::Quit) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "session failed");
                    emit(output, &format!("Fatal: {}", e)).await?;
                    return Err(e);
                }
            }
        }
    }
}

/// Race a session call against `interrupt`; an interrupt abandons the
/// session
async fn interruptible<T, C, F>(call: C, interrupt: F) -> Result<T>
where
    C: Future<Output = Result<T>>,
    F: Future<Output = ()>,
{
    tokio::select! {
        result = call => result,
        _ = interrupt => {
            warn!("interrupted while waiting for the server");
            Err(McpError::transport("interrupted while waiting for the server").into())
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::local::LocalSession;
    use crate::client::session::ToolResult;
    use crate::mcp::tools::default_registry;
    use async_trait::async_trait;

    fn dispatcher() -> Dispatcher<LocalSession> {
        Dispatcher::new(LocalSession::new(default_registry().unwrap()))
    }

    fn parse(line: &str) -> ParsedCommand {
        ParsedCommand::parse(line).unwrap()
    }

    /// Session whose transport is already broken
    struct DeadSession;

    #[async_trait]
    impl ToolSession for DeadSession {
        async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
            Err(McpError::transport("server closed the connection").into())
        }

        async fn call_tool(&mut self, _name: &str, _arguments: Value) -> Result<ToolResult> {
            Err(McpError::transport("server closed the connection").into())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_write() {
        let action = resolve(&parse(r#"write a.txt "hello world""#)).unwrap();
        assert_eq!(
            action,
            Action::Call(Invocation {
                tool: "write_file",
                arguments: json!({"filepath": "a.txt", "content": "hello world"}),
            })
        );

        let action = resolve(&parse("write notes.txt several loose words")).unwrap();
        let Action::Call(invocation) = action else {
            panic!("expected a call");
        };
        assert_eq!(invocation.arguments["content"], "several loose words");
    }

    #[test]
    fn test_resolve_calc_uses_raw_remainder() {
        let action = resolve(&parse("CALC  max(1,  2) * 3")).unwrap();
        assert_eq!(
            action,
            Action::Call(Invocation {
                tool: "calculate",
                arguments: json!({"expression": "max(1,  2) * 3"}),
            })
        );
    }

    #[test]
    fn test_resolve_ls_defaults() {
        let Action::Call(invocation) = resolve(&parse("ls")).unwrap() else {
            panic!("expected a call");
        };
        assert_eq!(invocation.arguments["directory"], ".");
        assert!(matches!(
            resolve(&parse("ls a b")),
            Err(CommandError::TooManyArguments { .. })
        ));
    }

    #[test]
    fn test_resolve_usage_errors() {
        assert!(matches!(
            resolve(&parse("calc")),
            Err(CommandError::MissingArgument { .. })
        ));
        assert!(matches!(
            resolve(&parse("read")),
            Err(CommandError::MissingArgument { .. })
        ));
        assert!(matches!(
            resolve(&parse("write only-a-path")),
            Err(CommandError::MissingArgument { .. })
        ));
        assert_eq!(resolve(&parse("Quit")).unwrap(), Action::Quit);
        assert_eq!(resolve(&parse("?")).unwrap(), Action::Help);
    }

    #[tokio::test]
    async fn test_unknown_verb_is_not_fatal() {
        let mut d = dispatcher();
        let outcome = d.dispatch("frobnicate now").await.unwrap();
        let Outcome::Output(text) = outcome else {
            panic!("expected output");
        };
        assert!(text.contains("Unknown command: frobnicate"));
        assert!(text.contains("help"));
        assert_eq!(d.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn test_blank_line_is_silent() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch("   ").await.unwrap(), Outcome::Silent);
    }

    #[tokio::test]
    async fn test_calc_dispatch() {
        let mut d = dispatcher();
        let outcome = d.dispatch("calc 2 + 3 * 4").await.unwrap();
        assert_eq!(outcome, Outcome::Output("Result: 2 + 3 * 4 = 14".to_string()));
        assert_eq!(d.state(), LoopState::Idle);

        let outcome = d.dispatch("calc __import__('os')").await.unwrap();
        let Outcome::Output(text) = outcome else {
            panic!("expected output");
        };
        assert!(text.starts_with("Error:"));
        assert_eq!(d.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn test_missing_file_keeps_session_open() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let mut d = dispatcher();

        let outcome = d
            .dispatch(&format!("read '{}'", missing.display()))
            .await
            .unwrap();
        let Outcome::Output(text) = outcome else {
            panic!("expected output");
        };
        assert!(text.contains("not found"));
        assert_eq!(d.state(), LoopState::Idle);

        assert!(matches!(d.dispatch("help").await.unwrap(), Outcome::Output(_)));
    }

    #[tokio::test]
    async fn test_quit_closes() {
        let mut d = dispatcher();
        assert_eq!(d.dispatch("quit").await.unwrap(), Outcome::Quit);
        assert_eq!(d.state(), LoopState::Closed);
        assert!(d.dispatch("help").await.is_err());
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal() {
        let mut d = Dispatcher::new(DeadSession);
        let err = d.dispatch("calc 1 + 1").await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(d.state(), LoopState::Closed);
    }

    /// Session whose server never answers
    struct HungSession;

    #[async_trait]
    impl ToolSession for HungSession {
        async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
            pending().await
        }

        async fn call_tool(&mut self, _name: &str, _arguments: Value) -> Result<ToolResult> {
            pending().await
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_interrupt_abandons_pending_call() {
        let mut d = Dispatcher::new(HungSession);
        let err = d.dispatch_until("calc 1 + 1", async {}).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("interrupted"));
        assert_eq!(d.state(), LoopState::Closed);

        let mut d = Dispatcher::new(HungSession);
        assert!(d.dispatch_until("tools", async {}).await.is_err());
        assert_eq!(d.state(), LoopState::Closed);
    }

    #[tokio::test]
    async fn test_interrupt_ignored_without_pending_call() {
        let mut d = dispatcher();
        let outcome = d.dispatch_until("help", async {}).await.unwrap();
        assert!(matches!(outcome, Outcome::Output(_)));
        assert_eq!(d.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn test_tools_refreshes_cache() {
        let mut d = dispatcher();
        assert!(d.tools().is_empty());
        let outcome = d.dispatch("tools").await.unwrap();
        assert!(matches!(outcome, Outcome::Output(ref t) if t.contains("write_file")));
        assert_eq!(d.tools().len(), 4);
    }

    #[test]
    fn test_help_lists_every_verb() {
        let help = help_text();
        for word in ["help", "tools", "calc", "ls", "read", "write", "quit"] {
            assert!(help.contains(word), "missing {}", word);
        }
    }
}
