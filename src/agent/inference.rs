// Tool loop - bounded dispatch / execute cycle over a backend and the tool catalog

use crate::agent::error::InferenceError;
use crate::agent::types::{BrainReply, LoopOutcome, ToolExchange, Turn};
use crate::brain::{BrainError, ToolDefinition};
use crate::executor::{Executor, ToolOutput};
use crate::parser::{reconstruct_text, EventType, StreamEvent, ToolCallPayload};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Trait for brain reference (for testing)
#[async_trait::async_trait]
pub trait BrainRef: Send + Sync {
    async fn dispatch(&self, turn: Turn<'_>) -> Result<BrainReply, BrainError>;
}

/// Trait for executor reference (for testing)
#[async_trait::async_trait]
pub trait ExecutorRef: Send + Sync {
    async fn execute(&self, tool_name: &str, input: serde_json::Value) -> Result<ToolOutput, String>;
    fn tool_definitions(&self) -> Vec<ToolDefinition>;
}

#[async_trait::async_trait]
impl ExecutorRef for Executor {
    async fn execute(&self, tool_name: &str, input: serde_json::Value) -> Result<ToolOutput, String> {
        Executor::execute(self, tool_name, input)
            .await
            .map_err(|e| e.to_string())
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        Executor::tool_definitions(self)
    }
}

/// Inputs of one loop run
#[derive(Debug, Clone, Copy)]
pub struct LoopRequest<'a> {
    pub prompt: &'a str,
    pub system: Option<&'a str>,
    pub timeout: Duration,
    pub max_tool_rounds: u32,
    pub cancel: Option<&'a CancellationToken>,
}

enum LoopState {
    Dispatch,
    AwaitingResponse(BrainReply),
    ExecutingTool(Vec<ToolCallPayload>),
    Done,
}

/// Run the tool loop until the model stops asking for tools or the round budget is spent.
///
/// The timeout covers the whole loop; each dispatch gets whatever is left of it.
/// Running out of rounds is not an error: the loop ends with the text gathered so far.
pub async fn run_with_tools<B: BrainRef, E: ExecutorRef>(
    brain: &B,
    executor: &E,
    request: LoopRequest<'_>,
) -> Result<LoopOutcome, InferenceError> {
    let tools = executor.tool_definitions();
    let deadline = Instant::now() + request.timeout;
    let timeout_ms = request.timeout.as_millis() as u64;

    let mut exchanges: Vec<ToolExchange> = Vec::new();
    let mut events: Vec<StreamEvent> = Vec::new();
    let mut raw = None;
    let mut tool_rounds = 0u32;
    let mut exhausted = false;
    let mut state = LoopState::Dispatch;

    loop {
        state = match state {
            LoopState::Dispatch => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    warn!(tool_rounds, timeout_ms, "tool loop ran out of time");
                    return Err(InferenceError::Timeout(timeout_ms));
                }

                debug!(round = tool_rounds, exchanges = exchanges.len(), "dispatching");
                let reply = brain
                    .dispatch(Turn {
                        prompt: request.prompt,
                        system: request.system,
                        tools: &tools,
                        exchanges: &exchanges,
                        timeout: remaining,
                        cancel: request.cancel,
                    })
                    .await?;
                LoopState::AwaitingResponse(reply)
            }
            LoopState::AwaitingResponse(reply) => {
                let pending = pending_tool_calls(&reply.events);
                events.extend(reply.events);
                if reply.raw.is_some() {
                    raw = reply.raw;
                }

                if pending.is_empty() {
                    LoopState::Done
                } else if tool_rounds >= request.max_tool_rounds {
                    warn!(
                        max_tool_rounds = request.max_tool_rounds,
                        pending = pending.len(),
                        "tool round budget exhausted"
                    );
                    exhausted = true;
                    LoopState::Done
                } else {
                    LoopState::ExecutingTool(pending)
                }
            }
            LoopState::ExecutingTool(calls) => {
                tool_rounds += 1;
                for call in calls {
                    let output = match executor.execute(&call.name, call.arguments.clone()).await {
                        Ok(output) => output,
                        Err(e) => ToolOutput::error(format!("Error: {}", e)),
                    };
                    debug!(
                        tool = %call.name,
                        is_error = output.is_error,
                        output_len = output.content.len(),
                        "tool executed"
                    );
                    events.push(StreamEvent::tool_result(&call.name, output.to_value()));
                    exchanges.push(ToolExchange { call, output });
                }
                LoopState::Dispatch
            }
            LoopState::Done => break,
        };
    }

    info!(tool_rounds, exhausted, events = events.len(), "tool loop finished");
    Ok(LoopOutcome {
        text: reconstruct_text(&events),
        events,
        raw,
        tool_rounds,
        exhausted,
    })
}

/// Tool calls in a reply that no later `tool_result` of the same name answers.
pub fn pending_tool_calls(events: &[StreamEvent]) -> Vec<ToolCallPayload> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == EventType::ToolCall)
        .filter_map(|(index, event)| {
            let call = event.tool_call.as_ref()?;
            let answered = events[index + 1..].iter().any(|later| {
                later.kind == EventType::ToolResult
                    && later.tool_result.as_ref().is_some_and(|r| r.name == call.name)
            });
            (!answered).then(|| call.clone())
        })
        .collect()
}
