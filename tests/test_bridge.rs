use gemini_bridge::agent::AgentConfig;
use gemini_bridge::auth::AuthConfig;
use gemini_bridge::brain::{BrainConfig, CliConfig};
use gemini_bridge::bridge::{Bridge, BridgeConfig, ErrorKind, ExecutionRequest, ExecutionResult, OutputMode};
use gemini_bridge::executor::ExecutorConfig;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt;
use wiremock::matchers::{body_string_contains, method, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Initialize tracing subscriber for tests
fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_test_writer()
            .init();
    });
}

/// Config rooted in `workspace` with no ambient credentials
fn base_config(workspace: &TempDir) -> BridgeConfig {
    BridgeConfig {
        auth: AuthConfig {
            api_key: None,
            credential_file: Some(workspace.path().join("missing.env")),
            accounts_file: Some(workspace.path().join("missing_accounts.json")),
        },
        brain: BrainConfig::default(),
        cli: CliConfig::default(),
        executor: ExecutorConfig {
            workspace_root: workspace.path().to_path_buf(),
            tools_toml_path: workspace.path().join("tools.toml"),
            ..ExecutorConfig::default()
        },
        agent: AgentConfig::default(),
    }
}

fn direct_config(workspace: &TempDir, server: &MockServer) -> BridgeConfig {
    let mut config = base_config(workspace);
    config.auth.api_key = Some("test-key".to_string());
    config.brain.api_base = server.uri();
    config
}

fn text_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
}

mod direct_tests {
    use super::*;

    #[tokio::test]
    async fn test_ping_pong() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/v1beta/models/gemini-2\.5-pro:generateContent$"))
            .and(query_param("key", "test-key"))
            .respond_with(text_reply("pong"))
            .expect(1)
            .mount(&server)
            .await;

        let bridge = Bridge::new(direct_config(&workspace, &server)).unwrap();
        let result = bridge
            .execute(ExecutionRequest::new("Reply with exactly: pong"))
            .await;

        assert!(result.is_success(), "{:?}", result);
        assert_eq!(result.text(), Some("pong"));
    }

    #[tokio::test]
    async fn test_model_override_and_structured_raw() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/models/gemini-2\.5-flash:generateContent$"))
            .respond_with(text_reply("hi"))
            .expect(1)
            .mount(&server)
            .await;

        let bridge = Bridge::new(direct_config(&workspace, &server)).unwrap();
        let result = bridge
            .execute(
                ExecutionRequest::new("hello")
                    .model("gemini-2.5-flash")
                    .output_mode(OutputMode::Structured),
            )
            .await;

        match result {
            ExecutionResult::Success {
                text,
                raw_structured,
                events,
                ..
            } => {
                assert_eq!(text, "hi");
                let raw = raw_structured.expect("structured mode keeps the raw response");
                assert_eq!(raw["candidates"][0]["content"]["parts"][0]["text"], "hi");
                assert!(events.is_none());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_timeout_never_dispatches() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("unreachable"))
            .expect(0)
            .mount(&server)
            .await;

        let bridge = Bridge::new(direct_config(&workspace, &server)).unwrap();
        for timeout in [0, -5] {
            let result = bridge
                .execute(ExecutionRequest::new("hello").timeout_ms(timeout))
                .await;
            assert_eq!(result.kind(), Some(ErrorKind::InvalidRequest));
        }
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let bridge = Bridge::new(direct_config(&workspace, &server)).unwrap();
        let result = bridge.execute(ExecutionRequest::new("hello")).await;

        assert_eq!(result.kind(), Some(ErrorKind::RateLimited));
    }

    #[tokio::test]
    async fn test_invalid_key() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key not valid" }
            })))
            .mount(&server)
            .await;

        let bridge = Bridge::new(direct_config(&workspace, &server)).unwrap();
        let result = bridge.execute(ExecutionRequest::new("hello")).await;

        assert_eq!(result.kind(), Some(ErrorKind::InvalidCredential));
    }

    #[tokio::test]
    async fn test_slow_api_times_out() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("late").set_delay(std::time::Duration::from_secs(5)))
            .mount(&server)
            .await;

        let bridge = Bridge::new(direct_config(&workspace, &server)).unwrap();
        let result = bridge
            .execute(ExecutionRequest::new("hello").timeout_ms(100))
            .await;

        assert_eq!(result.kind(), Some(ErrorKind::NetworkError));
        assert!(result.duration_ms() < 5_000);
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        fs::write(workspace.path().join("notes.txt"), "the answer is 42").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("functionResponse"))
            .respond_with(text_reply("The file says 42."))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "functionCall": { "name": "read_file", "args": { "path": "notes.txt" } } }]
                    }
                }]
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        let bridge = Bridge::new(direct_config(&workspace, &server)).unwrap();
        let result = bridge
            .execute(ExecutionRequest::new("What does notes.txt say?").tools_enabled(true))
            .await;

        match result {
            ExecutionResult::Success { text, events, .. } => {
                assert!(text.contains("42"), "{}", text);
                let events = events.expect("tool runs report events");
                let tool_result = events
                    .iter()
                    .find_map(|e| e.tool_result.as_ref())
                    .expect("tool_result event");
                assert_eq!(tool_result.name, "read_file");
                assert!(tool_result.result.to_string().contains("the answer is 42"));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("late").set_delay(std::time::Duration::from_secs(5)))
            .mount(&server)
            .await;

        let bridge = Bridge::new(direct_config(&workspace, &server)).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = bridge
            .execute_with_cancel(ExecutionRequest::new("hello"), Some(cancel))
            .await;
        assert_eq!(result.kind(), Some(ErrorKind::Cancelled));
    }
}

mod request_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_credential() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let bridge = Bridge::new(base_config(&workspace)).unwrap();

        let result = bridge.execute(ExecutionRequest::new("hello")).await;

        match result {
            ExecutionResult::Failure { reason, kind, .. } => {
                assert_eq!(kind, ErrorKind::NoCredential);
                assert!(reason.contains("GEMINI_API_KEY"), "{}", reason);
                assert!(reason.contains("missing.env"), "{}", reason);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_credential_file_is_read_per_request() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("key", "from-file"))
            .respond_with(text_reply("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = base_config(&workspace);
        config.brain.api_base = server.uri();
        let bridge = Bridge::new(config).unwrap();

        let before = bridge.execute(ExecutionRequest::new("hello")).await;
        assert_eq!(before.kind(), Some(ErrorKind::NoCredential));

        fs::write(workspace.path().join("missing.env"), "GEMINI_API_KEY=from-file\n").unwrap();
        let after = bridge.execute(ExecutionRequest::new("hello")).await;
        assert_eq!(after.text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_empty_prompt() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let bridge = Bridge::new(base_config(&workspace)).unwrap();

        let result = bridge.execute(ExecutionRequest::new("   ")).await;
        assert_eq!(result.kind(), Some(ErrorKind::InvalidRequest));
    }

    #[tokio::test]
    async fn test_working_directory_outside_workspace() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let mut config = base_config(&workspace);
        config.auth.api_key = Some("unused".to_string());
        let bridge = Bridge::new(config).unwrap();

        let result = bridge
            .execute(ExecutionRequest::new("hello").working_directory(elsewhere.path()))
            .await;
        assert_eq!(result.kind(), Some(ErrorKind::ToolSandboxViolation));

        let result = bridge
            .execute(ExecutionRequest::new("hello").include_path("../"))
            .await;
        assert_eq!(result.kind(), Some(ErrorKind::ToolSandboxViolation));
    }

    #[tokio::test]
    async fn test_missing_workspace_root() {
        let workspace = TempDir::new().unwrap();
        let mut config = base_config(&workspace);
        config.executor.workspace_root = workspace.path().join("does-not-exist");
        assert!(Bridge::new(config).is_err());
    }
}

#[cfg(unix)]
mod cli_tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Stand-in for the Gemini CLI: a shell script with the given body
    fn write_stub(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("gemini-stub");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// Delegated login plus the stub as the configured CLI
    fn cli_config(workspace: &TempDir, stub_dir: &TempDir, body: &str) -> BridgeConfig {
        let accounts = stub_dir.path().join("google_accounts.json");
        fs::write(&accounts, r#"{"active":"me@example.com","old":[]}"#).unwrap();

        let mut config = base_config(workspace);
        config.auth.accounts_file = Some(accounts);
        config.cli.cli_path = Some(write_stub(stub_dir.path(), body));
        config
    }

    #[tokio::test]
    async fn test_structured_output() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let stub_dir = TempDir::new().unwrap();
        let body = r#"echo 'Loaded cached credentials.'
echo '{"response":"pong","stats":{"models":{}}}'"#;
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, body)).unwrap();

        let result = bridge
            .execute(ExecutionRequest::new("ping").output_mode(OutputMode::Structured))
            .await;

        match result {
            ExecutionResult::Success {
                text,
                raw_structured,
                ..
            } => {
                assert_eq!(text, "pong");
                assert_eq!(raw_structured.unwrap()["response"], "pong");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plain_stdout_fallback() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let stub_dir = TempDir::new().unwrap();
        let bridge =
            Bridge::new(cli_config(&workspace, &stub_dir, "echo 'just text'")).unwrap();

        let result = bridge.execute(ExecutionRequest::new("ping")).await;
        assert_eq!(result.text(), Some("just text"));
    }

    #[tokio::test]
    async fn test_prompt_is_passed_verbatim() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let stub_dir = TempDir::new().unwrap();
        // Echo the last argument back as the response.
        let body = r#"for arg in "$@"; do last="$arg"; done
printf '{"response":"%s"}\n' "$last""#;
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, body)).unwrap();

        let result = bridge
            .execute(ExecutionRequest::new("--yolo is not a flag here"))
            .await;
        assert_eq!(result.text(), Some("--yolo is not a flag here"));
    }

    #[tokio::test]
    async fn test_flags_precede_prompt() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        fs::create_dir(workspace.path().join("docs")).unwrap();
        let stub_dir = TempDir::new().unwrap();
        let log = stub_dir.path().join("argv.log");
        let body = format!(
            r#"for arg in "$@"; do printf '<%s>' "$arg"; done > '{}'
echo '{{"type":"text","content":"ok"}}'"#,
            log.display()
        );
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, &body)).unwrap();

        let result = bridge
            .execute(
                ExecutionRequest::new("look around")
                    .include_path("docs")
                    .tools_enabled(true),
            )
            .await;
        assert_eq!(result.text(), Some("ok"), "{:?}", result);

        let argv = fs::read_to_string(&log).unwrap();
        assert!(argv.contains("<-o><stream-json>"), "{}", argv);
        let include = argv.find("<--include-directories>").unwrap();
        let yolo = argv.find("<--yolo>").unwrap();
        let prompt = argv.find("<look around").unwrap();
        assert!(include < prompt && yolo < prompt, "{}", argv);
    }

    #[tokio::test]
    async fn test_tool_loop_through_cli() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        fs::write(workspace.path().join("a.txt"), "alpha").unwrap();
        let stub_dir = TempDir::new().unwrap();
        // Ask for the file first; answer once its contents come back in the prompt.
        let body = r#"for arg in "$@"; do last="$arg"; done
case "$last" in
  *alpha*) echo '{"type":"text","content":"saw alpha"}' ;;
  *) echo '{"type":"tool_call","toolCall":{"name":"read_file","arguments":{"path":"a.txt"}}}' ;;
esac"#;
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, body)).unwrap();

        let result = bridge
            .execute(ExecutionRequest::new("What is in a.txt?").tools_enabled(true))
            .await;

        match result {
            ExecutionResult::Success { text, events, .. } => {
                assert_eq!(text, "saw alpha");
                let events = events.expect("tool runs report their events");
                let tool_result = events
                    .iter()
                    .find_map(|e| e.tool_result.as_ref())
                    .expect("the read_file result is recorded");
                assert_eq!(tool_result.name, "read_file");
                assert!(tool_result.result.to_string().contains("alpha"));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_in_later_round_reports_requested_limit() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        fs::write(workspace.path().join("a.txt"), "alpha").unwrap();
        let stub_dir = TempDir::new().unwrap();
        let body = r#"for arg in "$@"; do last="$arg"; done
case "$last" in
  *alpha*) sleep 10 ;;
  *) echo '{"type":"tool_call","toolCall":{"name":"read_file","arguments":{"path":"a.txt"}}}' ;;
esac"#;
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, body)).unwrap();

        let result = bridge
            .execute(
                ExecutionRequest::new("What is in a.txt?")
                    .tools_enabled(true)
                    .timeout_ms(700),
            )
            .await;

        match result {
            ExecutionResult::Failure { reason, kind, .. } => {
                assert_eq!(kind, ErrorKind::ProcessTimeout);
                assert!(reason.contains("700ms"), "{}", reason);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let stub_dir = TempDir::new().unwrap();
        let body = "echo 'Error: not authenticated' >&2\nexit 1";
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, body)).unwrap();

        let result = bridge.execute(ExecutionRequest::new("ping")).await;

        match result {
            ExecutionResult::Failure {
                reason,
                kind,
                exit_code,
                ..
            } => {
                assert_eq!(kind, ErrorKind::ProcessNonZeroExit);
                assert_eq!(exit_code, Some(1));
                assert!(reason.contains("not authenticated"), "{}", reason);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let stub_dir = TempDir::new().unwrap();
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, "sleep 10")).unwrap();

        let result = bridge
            .execute(ExecutionRequest::new("ping").timeout_ms(200))
            .await;

        assert_eq!(result.kind(), Some(ErrorKind::ProcessTimeout));
        assert!(result.duration_ms() < 5_000);
    }

    #[tokio::test]
    async fn test_reported_error_with_zero_exit() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let stub_dir = TempDir::new().unwrap();
        let body = r#"echo '{"error":{"type":"ApiError","message":"Quota exceeded for requests","code":429}}'"#;
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, body)).unwrap();

        let result = bridge.execute(ExecutionRequest::new("ping")).await;
        assert_eq!(result.kind(), Some(ErrorKind::RateLimited));
    }

    #[tokio::test]
    async fn test_empty_output_is_parse_failure() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let stub_dir = TempDir::new().unwrap();
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, "exit 0")).unwrap();

        let result = bridge.execute(ExecutionRequest::new("ping")).await;
        assert_eq!(result.kind(), Some(ErrorKind::ParseFailure));
    }

    #[tokio::test]
    async fn test_streaming_events() {
        init_tracing();
        let workspace = TempDir::new().unwrap();
        let stub_dir = TempDir::new().unwrap();
        let body = r#"echo '{"type":"start"}'
echo 'Loaded cached credentials.'
echo '{"type":"text","content":"po"}'
echo '{"type":"text","content":"ng"}'
echo '{"type":"end"}'"#;
        let bridge = Bridge::new(cli_config(&workspace, &stub_dir, body)).unwrap();

        let result = bridge
            .execute(ExecutionRequest::new("ping").output_mode(OutputMode::Streaming))
            .await;

        match result {
            ExecutionResult::Success { text, events, .. } => {
                assert_eq!(text, "pong");
                assert_eq!(events.unwrap().len(), 4);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }
}
