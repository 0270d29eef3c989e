// MCP request handling shared by both transports

use crate::bridge::{Bridge, ExecutionRequest, ExecutionResult, OutputMode};
use crate::comm::types::{
    AskArgs, RpcRequest, RpcResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use futures::FutureExt;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const ASK_TOOL: &str = "ask-gemini";
pub const PING_TOOL: &str = "ping";

/// Dispatches MCP methods to the execution core
pub struct McpHandler {
    bridge: Arc<Bridge>,
    service_name: String,
}

impl McpHandler {
    pub fn new(bridge: Arc<Bridge>, service_name: impl Into<String>) -> Self {
        Self {
            bridge,
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Handle one raw JSON line. `None` means nothing to send back.
    pub async fn handle_text(&self, text: &str, cancel: Option<CancellationToken>) -> Option<RpcResponse> {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparsable message");
                return Some(RpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };
        self.handle_value(value, cancel).await
    }

    /// Handle one parsed message
    pub async fn handle_value(&self, value: Value, cancel: Option<CancellationToken>) -> Option<RpcResponse> {
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<RpcRequest>(value) {
            Ok(request) => self.handle(request, cancel).await,
            Err(e) => Some(RpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            )),
        }
    }

    /// Handle one request. A panic inside is logged and answered, never propagated.
    pub async fn handle(&self, request: RpcRequest, cancel: Option<CancellationToken>) -> Option<RpcResponse> {
        let id = request.id.clone();
        let method = request.method.clone();

        match AssertUnwindSafe(self.dispatch(request, cancel)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(method = %method, panic = %message, "request handler panicked");
                id.map(|id| RpcResponse::error(id, INTERNAL_ERROR, "Internal error"))
            }
        }
    }

    async fn dispatch(&self, request: RpcRequest, cancel: Option<CancellationToken>) -> Option<RpcResponse> {
        if request.jsonrpc.as_deref().is_some_and(|v| v != JSONRPC_VERSION) {
            return request.id.map(|id| {
                RpcResponse::error(id, INVALID_REQUEST, "Unsupported jsonrpc version")
            });
        }

        debug!(method = %request.method, notification = request.is_notification(), "handling message");

        // Notifications never get a reply.
        let Some(id) = request.id else {
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => RpcResponse::result(id, self.initialize(&request.params)),
            "ping" => RpcResponse::result(id, json!({})),
            "tools/list" => RpcResponse::result(id, json!({ "tools": tool_list() })),
            "tools/call" => match self.call_tool(&request.params, cancel).await {
                Ok(result) => RpcResponse::result(id, result),
                Err(message) => RpcResponse::error(id, INVALID_PARAMS, message),
            },
            other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        };
        Some(response)
    }

    fn initialize(&self, params: &Value) -> Value {
        let client_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION);
        let client_name = params
            .pointer("/clientInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client = %client_name, protocol_version = %client_version, "client initializing");

        json!({
            "protocolVersion": client_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": self.service_name,
                "version": env!("CARGO_PKG_VERSION"),
            }
        })
    }

    /// `Err` carries an invalid-params message; execution failures are `isError` results.
    async fn call_tool(&self, params: &Value, cancel: Option<CancellationToken>) -> Result<Value, String> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "Missing tool name".to_string())?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        match name {
            ASK_TOOL => {
                let args: AskArgs = serde_json::from_value(arguments)
                    .map_err(|e| format!("Invalid arguments for {}: {}", ASK_TOOL, e))?;
                let explicit_timeout = args.timeout_ms.is_some();
                let mut request: ExecutionRequest = args.into();
                if !explicit_timeout {
                    request.timeout_ms = self.bridge.default_timeout_ms();
                }
                let mode = request.output_mode;
                let result = self.bridge.execute_with_cancel(request, cancel).await;
                Ok(tool_result(&result, mode))
            }
            PING_TOOL => {
                let message = arguments
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("pong");
                Ok(json!({
                    "content": [{ "type": "text", "text": message }],
                    "isError": false
                }))
            }
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}

/// MCP `CallToolResult` for an execution result
fn tool_result(result: &ExecutionResult, mode: OutputMode) -> Value {
    match result {
        ExecutionResult::Success { text, .. } => {
            let mut value = json!({
                "content": [{ "type": "text", "text": text }],
                "isError": false
            });
            if mode != OutputMode::Text {
                if let Ok(structured) = serde_json::to_value(result) {
                    value["structuredContent"] = structured;
                }
            }
            value
        }
        ExecutionResult::Failure { reason, kind, .. } => json!({
            "content": [{ "type": "text", "text": reason }],
            "isError": true,
            "_meta": { "errorKind": kind }
        }),
    }
}

/// Tools offered to MCP clients
pub fn tool_list() -> Value {
    json!([
        {
            "name": ASK_TOOL,
            "description": "Send a prompt to Gemini and return its answer. Uses GEMINI_API_KEY when \
                            available, otherwise the signed-in Gemini CLI.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "prompt": { "type": "string", "description": "The question or instruction" },
                    "model": { "type": "string", "description": "Model name, e.g. gemini-2.5-pro" },
                    "timeoutMs": { "type": "integer", "minimum": 1, "description": "Time limit in milliseconds (default 120000)" },
                    "outputMode": { "type": "string", "enum": ["text", "structured", "streaming"] },
                    "toolsEnabled": { "type": "boolean", "description": "Let the model read files in the workspace" },
                    "includePaths": { "type": "array", "items": { "type": "string" } },
                    "workingDirectory": { "type": "string" }
                },
                "required": ["prompt"]
            }
        },
        {
            "name": PING_TOOL,
            "description": "Check that the bridge is reachable. Echoes the message.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "message": { "type": "string" }
                }
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ErrorKind;

    #[test]
    fn test_tool_list_names() {
        let tools = tool_list();
        let names: Vec<_> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ask-gemini", "ping"]);
    }

    #[test]
    fn test_success_result_text_mode() {
        let result = ExecutionResult::Success {
            text: "pong".to_string(),
            raw_structured: None,
            events: None,
            duration_ms: 3,
        };
        let value = tool_result(&result, OutputMode::Text);
        assert_eq!(value["content"][0]["text"], "pong");
        assert_eq!(value["isError"], false);
        assert!(value.get("structuredContent").is_none());
    }

    #[test]
    fn test_success_result_structured_mode() {
        let result = ExecutionResult::Success {
            text: "pong".to_string(),
            raw_structured: Some(json!({"response": "pong"})),
            events: None,
            duration_ms: 3,
        };
        let value = tool_result(&result, OutputMode::Structured);
        assert_eq!(value["structuredContent"]["rawStructured"]["response"], "pong");
    }

    #[test]
    fn test_failure_result() {
        let result = ExecutionResult::Failure {
            reason: "rate limited: slow down".to_string(),
            kind: ErrorKind::RateLimited,
            exit_code: None,
            duration_ms: 9,
        };
        let value = tool_result(&result, OutputMode::Text);
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["text"], "rate limited: slow down");
        assert_eq!(value["_meta"]["errorKind"], "RateLimited");
    }
}
