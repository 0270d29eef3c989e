// JSON-RPC 2.0 / MCP message shapes

use crate::bridge::{ExecutionRequest, OutputMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

pub const JSONRPC_VERSION: &str = "2.0";
/// MCP revision this server speaks
pub const PROTOCOL_VERSION: &str = "2025-03-26";
/// Header carrying the session id in HTTP mode
pub const SESSION_HEADER: &str = "mcp-session-id";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const SERVER_ERROR: i64 = -32000;

/// Inbound request or notification. A missing `id` marks a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Arguments of the `ask-gemini` tool
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskArgs {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<i64>,
    #[serde(default)]
    pub output_mode: Option<OutputMode>,
    #[serde(default)]
    pub tools_enabled: Option<bool>,
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

impl From<AskArgs> for ExecutionRequest {
    fn from(args: AskArgs) -> Self {
        let mut request = ExecutionRequest::new(args.prompt)
            .output_mode(args.output_mode.unwrap_or_default())
            .tools_enabled(args.tools_enabled.unwrap_or(false));
        if let Some(timeout_ms) = args.timeout_ms {
            request = request.timeout_ms(timeout_ms);
        }
        if let Some(model) = args.model {
            request = request.model(model);
        }
        if let Some(dir) = args.working_directory {
            request = request.working_directory(dir);
        }
        request.include_paths = args.include_paths;
        request
    }
}
