// Agent types

use crate::brain::ToolDefinition;
use crate::executor::ToolOutput;
use crate::parser::{StreamEvent, ToolCallPayload};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A tool call the loop executed locally, with what it produced
#[derive(Debug, Clone)]
pub struct ToolExchange {
    pub call: ToolCallPayload,
    pub output: ToolOutput,
}

/// Everything a backend needs for one dispatch
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub prompt: &'a str,
    pub system: Option<&'a str>,
    /// Catalog declared to the model; empty when tools are disabled
    pub tools: &'a [ToolDefinition],
    /// Earlier rounds, oldest first
    pub exchanges: &'a [ToolExchange],
    /// Time left for this dispatch
    pub timeout: Duration,
    pub cancel: Option<&'a CancellationToken>,
}

/// One backend reply normalized to stream events
#[derive(Debug, Clone, Default)]
pub struct BrainReply {
    pub events: Vec<StreamEvent>,
    /// Parsed structured object, when the backend produced one
    pub raw: Option<Value>,
}

/// Result of a full tool loop
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Concatenated text of every round
    pub text: String,
    pub events: Vec<StreamEvent>,
    /// Structured object of the last reply
    pub raw: Option<Value>,
    /// Rounds in which tools were actually executed
    pub tool_rounds: u32,
    /// The round budget ran out while the model still wanted tools
    pub exhausted: bool,
}

/// Tool loop configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum tool-execution rounds per request
    pub max_tool_rounds: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_tool_rounds: 10 }
    }
}
