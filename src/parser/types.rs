// Data types for Parser module - CLI output shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stream event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Start,
    Text,
    ToolCall,
    ToolResult,
    Error,
    End,
    Thinking,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// A tool result fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPayload {
    pub name: String,
    #[serde(default)]
    pub result: Value,
}

/// One line of `stream-json` output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResultPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl StreamEvent {
    pub fn new(kind: EventType) -> Self {
        Self {
            kind,
            content: None,
            tool_call: None,
            tool_result: None,
            timestamp: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::new(EventType::Text)
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_call: Some(ToolCallPayload {
                name: name.into(),
                arguments,
            }),
            ..Self::new(EventType::ToolCall)
        }
    }

    pub fn tool_result(name: impl Into<String>, result: Value) -> Self {
        Self {
            tool_result: Some(ToolResultPayload {
                name: name.into(),
                result,
            }),
            ..Self::new(EventType::ToolResult)
        }
    }
}

/// Error body the CLI prints in `json` mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliErrorBody {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<Value>,
}

/// Single-object `json` output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub stats: Option<Value>,
    #[serde(default)]
    pub error: Option<CliErrorBody>,
    /// The whole parsed object
    #[serde(skip)]
    pub raw: Value,
}

impl StructuredResponse {
    /// Usable answer text, if any
    pub fn answer(&self) -> Option<&str> {
        self.response
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
