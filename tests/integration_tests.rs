//! Integration tests for the simple MCP server and client
//!
//! These tests run the server loop over in-memory pipes, launch the real
//! server binary as a child process, and drive the interactive loop with
//! scripted input.

use serde_json::{json, Value};

/// Helper to create a JSON-RPC request line
fn make_request(id: i64, method: &str, params: Option<Value>) -> String {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    format!("{}\n", request)
}

/// Helper to parse a JSON-RPC response line
fn parse_response(json_str: &str) -> Value {
    serde_json::from_str(json_str).expect("Failed to parse JSON response")
}

fn server_binary() -> &'static str {
    env!("CARGO_BIN_EXE_simple-mcp-server")
}

mod server_loop_tests {
    use super::*;
    use simple_mcp::mcp::server::McpServer;
    use simple_mcp::mcp::tools::default_registry;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_session_over_duplex() {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_end);

        let server = tokio::spawn(async move {
            let mut server = McpServer::new(default_registry().unwrap());
            server.serve(BufReader::new(server_read), server_write).await
        });

        let (client_read, mut client_write) = tokio::io::split(client_end);
        let mut responses = BufReader::new(client_read).lines();

        client_write
            .write_all(
                make_request(
                    1,
                    "initialize",
                    Some(json!({
                        "protocolVersion": "2024-11-05",
                        "clientInfo": {"name": "test-client", "version": "1.0.0"},
                        "capabilities": {}
                    })),
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        let init = parse_response(&responses.next_line().await.unwrap().unwrap());
        assert_eq!(init["id"], 1);
        assert_eq!(init["result"]["serverInfo"]["name"], "simple-mcp-server");

        // Notifications get no response; the next line answers request 2
        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
            .await
            .unwrap();
        client_write
            .write_all(make_request(2, "tools/list", None).as_bytes())
            .await
            .unwrap();
        let list = parse_response(&responses.next_line().await.unwrap().unwrap());
        assert_eq!(list["id"], 2);
        let names: Vec<_> = list["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["calculate", "list_files", "read_file", "write_file"]);

        client_write
            .write_all(
                make_request(
                    3,
                    "tools/call",
                    Some(json!({"name": "calculate", "arguments": {"expression": "1 / 0"}})),
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        let call = parse_response(&responses.next_line().await.unwrap().unwrap());
        assert_eq!(call["result"]["isError"], true);
        assert!(call["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("division by zero"));

        client_write.write_all(b"garbage\n").await.unwrap();
        let bad = parse_response(&responses.next_line().await.unwrap().unwrap());
        assert!(bad["id"].is_null());
        assert_eq!(bad["error"]["code"], -32700);

        // Dropping one half of a split duplex does not close it; shut down to signal EOF
        client_write.shutdown().await.unwrap();
        drop(client_write);
        tokio_test::assert_ok!(server.await.unwrap());
    }
}

mod stdio_session_tests {
    use super::*;
    use simple_mcp::client::{StdioSession, ToolResult, ToolSession};
    use simple_mcp::config::ClientConfig;

    fn config() -> ClientConfig {
        let mut config = ClientConfig::new();
        config.server_command = vec![server_binary().to_string()];
        config
    }

    #[tokio::test]
    async fn test_connect_list_and_call() {
        let mut session = StdioSession::connect(&config()).await.unwrap();
        assert_eq!(session.server_info().unwrap().name, "simple-mcp-server");

        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools.len(), 4);
        assert_eq!(tools[1].signature(), "list_files([directory: string = \".\"])");

        let result = session
            .call_tool("calculate", json!({"expression": "sqrt(16) + pi"}))
            .await
            .unwrap();
        let ToolResult::Success { text, structured } = result else {
            panic!("expected success");
        };
        assert!(text.starts_with("Result: sqrt(16) + pi = 7.14159"));
        let value = structured.unwrap()["value"].as_f64().unwrap();
        assert!((value - 7.14159).abs() < 1e-5);

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.txt");
        let path = path.to_str().unwrap();
        let mut session = StdioSession::connect(&config()).await.unwrap();

        let written = session
            .call_tool("write_file", json!({"filepath": path, "content": "X"}))
            .await
            .unwrap();
        let ToolResult::Success { structured, .. } = written else {
            panic!("expected success");
        };
        assert_eq!(structured.unwrap()["bytesWritten"], 1);

        let read = session
            .call_tool("read_file", json!({"filepath": path}))
            .await
            .unwrap();
        assert!(matches!(read, ToolResult::Success { ref text, .. } if text.ends_with("\n\nX")));

        let missing = session
            .call_tool("read_file", json!({"filepath": dir.path().join("nope.txt")}))
            .await
            .unwrap();
        assert!(matches!(missing, ToolResult::Failure { ref message } if message.contains("not found")));

        // The session survives tool failures
        let again = session
            .call_tool("calculate", json!({"expression": "1 + 1"}))
            .await
            .unwrap();
        assert!(again.is_success());

        session.close().await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_launch_failure_is_transport_error() {
        let mut config = config();
        config.server_command = vec!["definitely-not-a-real-mcp-server".to_string()];

        let err = StdioSession::connect(&config).await.err().unwrap();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("failed to launch"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_server_exiting_is_transport_error() {
        let mut config = config();
        config.server_command = vec!["true".to_string()];

        let err = StdioSession::connect(&config).await.err().unwrap();
        assert!(err.is_fatal());
    }
}

mod interactive_tests {
    use simple_mcp::client::{Dispatcher, LocalSession, LoopState};
    use simple_mcp::mcp::tools::default_registry;

    async fn run_script(script: &str) -> (String, LoopState) {
        let mut dispatcher = Dispatcher::new(LocalSession::new(default_registry().unwrap()));
        let mut out = Vec::new();
        tokio_test::assert_ok!(dispatcher.run(script.as_bytes(), &mut out).await);
        (String::from_utf8(out).unwrap(), dispatcher.state())
    }

    #[tokio::test]
    async fn test_scripted_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        let script = format!(
            "help\ncalc 2 + 3 * 4\nfrobnicate\n\nwrite '{0}' \"Hello, World!\"\nread '{0}'\nquit\ncalc 1 + 1\n",
            file.display()
        );

        let (output, state) = run_script(&script).await;

        assert!(output.contains("=== Available Tools ==="));
        assert!(output.contains("=== Available Commands ==="));
        assert!(output.contains("Result: 2 + 3 * 4 = 14"));
        assert!(output.contains("Unknown command: frobnicate"));
        assert!(output.contains("Successfully wrote 13 bytes"));
        assert!(output.contains("Hello, World!"));
        // Nothing after quit is executed
        assert!(!output.contains("Result: 1 + 1"));
        assert_eq!(state, LoopState::Closed);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "Hello, World!");
    }

    #[tokio::test]
    async fn test_eof_ends_session() {
        let (output, state) = run_script("calc sqrt(16)\n").await;
        assert!(output.contains("Result: sqrt(16) = 4"));
        assert_eq!(state, LoopState::Closed);
    }

    #[tokio::test]
    async fn test_errors_do_not_end_session() {
        let (output, _) = run_script("calc 1 / 0\nread\nls a b\ncalc 6 * 7\n").await;
        assert!(output.contains("division by zero"));
        assert!(output.contains("Usage: read <filepath>"));
        assert!(output.contains("Usage: ls [directory]"));
        assert!(output.contains("Result: 6 * 7 = 42"));
    }
}

mod client_binary_tests {
    use super::*;
    use std::process::Command;

    fn client_binary() -> &'static str {
        env!("CARGO_BIN_EXE_simple-mcp-client")
    }

    #[test]
    fn test_demo_mode_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let output = Command::new(client_binary())
            .args(["demo", "--server", server_binary()])
            .current_dir(dir.path())
            .output()
            .unwrap();

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "stdout: {}", stdout);
        assert!(stdout.contains("Demo completed!"));
        assert!(dir.path().join("test_file.txt").exists());
    }

    #[test]
    fn test_demo_mode_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("blocked")).unwrap();

        let output = Command::new(client_binary())
            .args(["demo", "--local", "--file", "blocked"])
            .current_dir(dir.path())
            .output()
            .unwrap();

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("write_file"));
    }

    #[test]
    fn test_server_tools_subcommand() {
        let output = Command::new(server_binary()).arg("tools").output().unwrap();
        assert!(output.status.success());

        let catalog: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(catalog.as_array().unwrap().len(), 4);
        assert_eq!(catalog[0]["inputSchema"]["required"][0], "expression");
    }
}
