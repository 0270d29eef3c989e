// Multi-session HTTP transport

use crate::bridge::BridgeError;
use crate::comm::config::CommConfig;
use crate::comm::error::{CommError, CommInitError};
use crate::comm::protocol::McpHandler;
use crate::comm::session::SessionManager;
use crate::comm::types::{RpcResponse, PARSE_ERROR, SERVER_ERROR, SESSION_HEADER};
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub const HEALTH_PATH: &str = "/health";
pub const MCP_PATH: &str = "/mcp";

/// Host names accepted on `/mcp`, with or without a port
const ALLOWED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<McpHandler>,
    pub sessions: Arc<SessionManager>,
}

/// Build the router: `/health` always answers, `/mcp` checks the Host header first.
pub fn router(state: AppState) -> Router {
    let mcp = Router::new()
        .route(MCP_PATH, any(mcp))
        .route_layer(middleware::from_fn(validate_host));

    Router::new()
        .route(HEALTH_PATH, get(health))
        .merge(mcp)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` fires, then refuse new sessions, close the
/// live ones, and let in-flight responses drain.
pub async fn serve_http(
    config: &CommConfig,
    handler: Arc<McpHandler>,
    shutdown: CancellationToken,
) -> Result<(), CommInitError> {
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CommInitError::BindFailed(format!("{}: {}", addr, e)))?;
    let local = listener
        .local_addr()
        .map_err(|e| CommInitError::BindFailed(e.to_string()))?;

    let sessions = Arc::new(SessionManager::new(config.max_sessions));
    let app = router(AppState {
        handler,
        sessions: sessions.clone(),
    });

    info!(addr = %local, max_sessions = config.max_sessions, "HTTP transport listening");

    let drain = sessions.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("HTTP transport shutting down");
            drain.shutdown().await;
        })
        .await;

    if let Err(e) = result {
        warn!(error = %e, "HTTP server stopped with error");
    }
    info!(live_sessions = sessions.len().await, "HTTP transport closed");
    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": state.handler.service_name(),
    }))
}

/// Reject any Host that is not loopback before the request reaches a handler.
async fn validate_host(request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !is_allowed_host(host) {
        let err = BridgeError::InvalidHost(host.to_string());
        warn!(error = %err, "rejected request");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid Host header" })),
        )
            .into_response();
    }
    next.run(request).await
}

pub fn is_allowed_host(host: &str) -> bool {
    let host = host.trim().to_ascii_lowercase();
    let name = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => {
                let (name, rest) = host.split_at(end + 1);
                if !is_port_suffix(rest) {
                    return false;
                }
                name.to_string()
            }
            None => return false,
        }
    } else {
        match host.split_once(':') {
            Some((name, port)) => {
                if !is_port_suffix(&format!(":{}", port)) {
                    return false;
                }
                name.to_string()
            }
            None => host,
        }
    };
    ALLOWED_HOSTS.contains(&name.as_str())
}

fn is_port_suffix(rest: &str) -> bool {
    match rest.strip_prefix(':') {
        Some(port) => !port.is_empty() && port.parse::<u16>().is_ok(),
        None => rest.is_empty(),
    }
}

async fn mcp(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match method {
        Method::POST => post_message(&state, session_id, &body).await,
        Method::DELETE => delete_session(&state, session_id).await,
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "POST, DELETE")],
            Json(json!({ "error": "Method not allowed" })),
        )
            .into_response(),
    }
}

async fn post_message(state: &AppState, session_id: Option<String>, body: &[u8]) -> Response {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            let response = RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let session = match session_id {
        Some(id) => match state.sessions.get(&id).await {
            Some(session) => session,
            None => {
                debug!(session_id = %id, "unknown session");
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Session not found" })),
                )
                    .into_response();
            }
        },
        None => {
            let is_initialize = value.get("method").and_then(Value::as_str) == Some("initialize");
            if !is_initialize {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Missing Mcp-Session-Id header" })),
                )
                    .into_response();
            }
            match state.sessions.create().await {
                Ok(session) => session,
                Err(e) => return refusal(&value, e),
            }
        }
    };

    let response = state
        .handler
        .handle_value(value, Some(session.request_token()))
        .await;

    let mut http = match response {
        Some(rpc) => (StatusCode::OK, Json(rpc)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&session.id) {
        http.headers_mut().insert(SESSION_HEADER, value);
    }
    http
}

/// Session creation refused: JSON-RPC error with the request id.
fn refusal(request: &Value, err: CommError) -> Response {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let response = match &err {
        CommError::Refused(BridgeError::CapacityExceeded(max)) => {
            let mut response = RpcResponse::error(id, SERVER_ERROR, "server at capacity");
            if let Some(error) = response.error.as_mut() {
                error.data = Some(json!({ "maxSessions": max }));
            }
            response
        }
        other => RpcResponse::error(id, SERVER_ERROR, other.to_string()),
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
}

async fn delete_session(state: &AppState, session_id: Option<String>) -> Response {
    let Some(id) = session_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing Mcp-Session-Id header" })),
        )
            .into_response();
    };
    if state.sessions.close(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Session not found" })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_hosts() {
        for host in [
            "localhost",
            "localhost:8765",
            "LOCALHOST:1",
            "127.0.0.1",
            "127.0.0.1:8765",
            "[::1]",
            "[::1]:8765",
        ] {
            assert!(is_allowed_host(host), "{} should be allowed", host);
        }
    }

    #[test]
    fn test_rejected_hosts() {
        for host in [
            "",
            "evil.com",
            "evil.com:8765",
            "localhost.evil.com",
            "127.0.0.1.nip.io",
            "0.0.0.0:8765",
            "localhost:",
            "localhost:abc",
            "[::1",
            "[::1]x",
            "192.168.1.10:8765",
        ] {
            assert!(!is_allowed_host(host), "{} should be rejected", host);
        }
    }
}
