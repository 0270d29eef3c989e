// Data types for the execution core

use super::ErrorKind;
use crate::parser::StreamEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Timeout used when a request does not set one
pub const DEFAULT_TIMEOUT_MS: i64 = 120_000;

/// What shape of answer the caller wants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Answer text only
    #[default]
    Text,
    /// Answer text plus the parsed structured object
    Structured,
    /// Answer text plus the ordered event list
    Streaming,
}

impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputMode::Text),
            "structured" => Ok(OutputMode::Structured),
            "streaming" => Ok(OutputMode::Streaming),
            other => Err(format!("unknown output mode '{}'", other)),
        }
    }
}

/// One prompt submission. Built once, never mutated by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub prompt: String,
    /// Must be positive; checked before anything is dispatched
    pub timeout_ms: i64,
    /// Defaults to the workspace root
    pub working_directory: Option<PathBuf>,
    /// Extra directories the CLI may read
    pub include_paths: Vec<PathBuf>,
    pub output_mode: OutputMode,
    pub tools_enabled: bool,
    /// Defaults to the configured model
    pub model: Option<String>,
}

impl ExecutionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            working_directory: None,
            include_paths: Vec::new(),
            output_mode: OutputMode::Text,
            tools_enabled: false,
            model: None,
        }
    }

    pub fn timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn tools_enabled(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Terminal state of one request. `duration_ms` runs from dispatch to that state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ExecutionResult {
    Success {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_structured: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        events: Option<Vec<StreamEvent>>,
        duration_ms: u64,
    },
    Failure {
        reason: String,
        kind: ErrorKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        duration_ms: u64,
    },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    pub fn duration_ms(&self) -> u64 {
        match self {
            ExecutionResult::Success { duration_ms, .. }
            | ExecutionResult::Failure { duration_ms, .. } => *duration_ms,
        }
    }

    /// Answer text on success
    pub fn text(&self) -> Option<&str> {
        match self {
            ExecutionResult::Success { text, .. } => Some(text),
            ExecutionResult::Failure { .. } => None,
        }
    }

    /// Failure tag, if any
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ExecutionResult::Success { .. } => None,
            ExecutionResult::Failure { kind, .. } => Some(*kind),
        }
    }
}
