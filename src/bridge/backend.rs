// Per-request backends: one value per resolved credential, each a BrainRef

use crate::agent::{BrainReply, BrainRef, ToolExchange, Turn};
use crate::brain::cli::CliInvocation;
use crate::brain::{BrainError, GeminiCli, GeminiClient, OutputFormat, RequestBuilder};
use crate::parser::{parse_single, parse_stream, EventType, StreamEvent};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Direct HTTP backend bound to one secret
pub struct DirectBackend<'a> {
    pub client: &'a GeminiClient,
    pub secret: String,
    pub model: &'a str,
}

#[async_trait::async_trait]
impl BrainRef for DirectBackend<'_> {
    async fn dispatch(&self, turn: Turn<'_>) -> Result<BrainReply, BrainError> {
        let mut builder = RequestBuilder::new();
        if turn.tools.is_empty() && turn.exchanges.is_empty() && turn.system.is_none() {
            builder = builder.bare();
        }
        if let Some(system) = turn.system {
            builder = builder.system(system);
        }
        builder = builder.user_text(turn.prompt);
        for exchange in turn.exchanges {
            builder = builder
                .model_function_call(&exchange.call.name, exchange.call.arguments.clone())
                .user_function_response(&exchange.call.name, exchange.output.to_value());
        }
        let request = builder
            .tools(turn.tools.to_vec())
            .build()
            .map_err(BrainError::RequestBuild)?;

        let call = self
            .client
            .generate(self.model, &self.secret, &request, turn.timeout);
        let response = match turn.cancel {
            Some(token) => tokio::select! {
                result = call => result?,
                _ = token.cancelled() => return Err(BrainError::Cancelled),
            },
            None => call.await?,
        };

        let mut events = Vec::new();
        for part in response.parts() {
            if let Some(text) = &part.text {
                if part.thought == Some(true) {
                    events.push(StreamEvent {
                        content: Some(text.clone()),
                        ..StreamEvent::new(EventType::Thinking)
                    });
                } else {
                    events.push(StreamEvent::text(text));
                }
            }
            if let Some(call) = &part.function_call {
                events.push(StreamEvent::tool_call(&call.name, call.args.clone()));
            }
        }

        let has_text = events.iter().any(|e| e.kind == EventType::Text);
        let has_calls = events.iter().any(|e| e.kind == EventType::ToolCall);
        if !has_text && !has_calls {
            return Err(BrainError::NoText);
        }
        events.push(StreamEvent::new(EventType::End));

        Ok(BrainReply {
            events,
            raw: serde_json::to_value(&response).ok(),
        })
    }
}

/// CLI backend for a delegated login
pub struct CliBackend<'a> {
    pub cli: &'a GeminiCli,
    pub model: &'a str,
    pub format: OutputFormat,
    pub include_dirs: &'a [PathBuf],
    pub cwd: Option<&'a Path>,
    pub yolo: bool,
}

#[async_trait::async_trait]
impl BrainRef for CliBackend<'_> {
    async fn dispatch(&self, turn: Turn<'_>) -> Result<BrainReply, BrainError> {
        let prompt = render_prompt(&turn);
        let invocation = CliInvocation {
            model: self.model,
            format: self.format,
            include_dirs: self.include_dirs,
            yolo: self.yolo,
            prompt: &prompt,
        };

        let output = self
            .cli
            .run(&invocation, self.cwd, turn.timeout, turn.cancel.cloned())
            .await?;

        match self.format {
            OutputFormat::Json => single_reply(&output.stdout),
            OutputFormat::StreamJson => stream_reply(&output.stdout),
        }
    }
}

/// `json` output: the structured answer, else the raw trimmed stdout.
fn single_reply(stdout: &str) -> Result<BrainReply, BrainError> {
    let parsed = parse_single(stdout);

    if let Some(structured) = &parsed {
        if let Some(answer) = structured.answer() {
            return Ok(BrainReply {
                events: vec![StreamEvent::text(answer)],
                raw: Some(structured.raw.clone()),
            });
        }
        if let Some(error) = &structured.error {
            return Err(BrainError::CliReported(error.message.clone()));
        }
    }

    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(BrainError::ParseFailed);
    }
    debug!(stdout_len = trimmed.len(), "no structured answer, using raw stdout");
    Ok(BrainReply {
        events: vec![StreamEvent::text(trimmed)],
        raw: parsed.map(|s| s.raw),
    })
}

/// `stream-json` output: the event list, else the raw trimmed stdout as one text event.
fn stream_reply(stdout: &str) -> Result<BrainReply, BrainError> {
    let events = parse_stream(stdout);

    if events.is_empty() {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Err(BrainError::ParseFailed);
        }
        debug!(stdout_len = trimmed.len(), "no stream events, using raw stdout");
        return Ok(BrainReply {
            events: vec![StreamEvent::text(trimmed)],
            raw: None,
        });
    }

    let has_text = events.iter().any(|e| e.kind == EventType::Text);
    let has_calls = events.iter().any(|e| e.kind == EventType::ToolCall);
    if !has_text && !has_calls {
        if let Some(message) = events
            .iter()
            .filter(|e| e.kind == EventType::Error)
            .find_map(|e| e.content.clone())
        {
            return Err(BrainError::CliReported(message));
        }
    }

    Ok(BrainReply { events, raw: None })
}

/// The CLI has no system or function-response channel, so both travel in the prompt text.
fn render_prompt(turn: &Turn<'_>) -> String {
    let mut prompt = String::new();
    if let Some(system) = turn.system {
        prompt.push_str(system);
        prompt.push_str("\n\n");
    }
    prompt.push_str(turn.prompt);

    if !turn.exchanges.is_empty() {
        prompt.push_str("\n\nResults of the tools you requested:\n");
        for ToolExchange { call, output } in turn.exchanges {
            let status = if output.is_error { "error" } else { "output" };
            prompt.push_str(&format!(
                "\n[{} {}] {}:\n{}\n",
                call.name, call.arguments, status, output.content
            ));
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ToolOutput;
    use crate::parser::ToolCallPayload;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_single_reply_prefers_answer() {
        let stdout = "{\"tool\":\"echo\"}\n{\"response\":\"  forty-two \",\"stats\":{}}\n";
        let reply = single_reply(stdout).unwrap();
        assert_eq!(reply.events, vec![StreamEvent::text("forty-two")]);
        assert_eq!(reply.raw.unwrap()["stats"], json!({}));
    }

    #[test]
    fn test_single_reply_falls_back_to_stdout() {
        let reply = single_reply("  just words\n").unwrap();
        assert_eq!(reply.events, vec![StreamEvent::text("just words")]);
        assert!(reply.raw.is_none());
    }

    #[test]
    fn test_single_reply_error_body() {
        let stdout = r#"{"error":{"type":"ApiError","message":"Quota exceeded","code":429}}"#;
        let err = single_reply(stdout).unwrap_err();
        assert!(matches!(err, BrainError::CliReported(m) if m == "Quota exceeded"));
    }

    #[test]
    fn test_empty_output_is_parse_failure() {
        assert!(matches!(single_reply("  \n"), Err(BrainError::ParseFailed)));
        assert!(matches!(stream_reply(""), Err(BrainError::ParseFailed)));
    }

    #[test]
    fn test_stream_reply_keeps_events() {
        let stdout = concat!(
            "{\"type\":\"start\"}\n",
            "{\"type\":\"text\",\"content\":\"a\"}\n",
            "{\"type\":\"thinking\",\"content\":\"hmm\"}\n",
            "{\"type\":\"text\",\"content\":\"b\"}\n",
            "{\"type\":\"end\"}\n",
        );
        let reply = stream_reply(stdout).unwrap();
        assert_eq!(reply.events.len(), 5);
    }

    #[test]
    fn test_stream_reply_error_only() {
        let stdout = "{\"type\":\"error\",\"content\":\"model overloaded\"}\n";
        let err = stream_reply(stdout).unwrap_err();
        assert!(matches!(err, BrainError::CliReported(m) if m == "model overloaded"));
    }

    #[test]
    fn test_render_prompt_with_exchanges() {
        let exchanges = vec![ToolExchange {
            call: ToolCallPayload {
                name: "read_file".to_string(),
                arguments: json!({"path": "a.txt"}),
            },
            output: ToolOutput::success("alpha"),
        }];
        let turn = Turn {
            prompt: "summarize a.txt",
            system: Some("Be brief."),
            tools: &[],
            exchanges: &exchanges,
            timeout: Duration::from_secs(1),
            cancel: None,
        };
        let prompt = render_prompt(&turn);
        assert!(prompt.starts_with("Be brief.\n\nsummarize a.txt"));
        assert!(prompt.contains("[read_file {\"path\":\"a.txt\"}] output:\nalpha"));
    }
}
