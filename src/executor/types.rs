// Data types for Executor module

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text handed back to the model
    pub content: String,
    /// In-band failure (sandbox violation, missing file, bad pattern)
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }

    /// Shape used for function responses and `tool_result` events
    pub fn to_value(&self) -> Value {
        if self.is_error {
            json!({ "error": self.content })
        } else {
            json!({ "output": self.content })
        }
    }
}
