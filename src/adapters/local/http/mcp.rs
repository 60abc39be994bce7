//! Model Context Protocol endpoint (JSON-RPC 2.0) plus the plain JSON tool routes.

use super::auth::Authorized;
use super::tools::{self, ToolResult};
use super::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const UNAUTHORIZED: i64 = -32001;

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {}, "resources": {}, "prompts": {}, "logging": {} },
        "serverInfo": { "name": "mychannel", "version": env!("CARGO_PKG_VERSION") },
    })
}

fn tool_content(result: &ToolResult) -> Value {
    let text = serde_json::to_string(result).unwrap_or_default();
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": result.is_error(),
    })
}

/// `POST /`
pub async fn rpc(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    body: String,
) -> Response {
    let request: Value = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Unparseable JSON-RPC request");
            return Json(RpcResponse::error(Value::Null, PARSE_ERROR, "Parse error")).into_response();
        }
    };

    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
    let Some(id) = request.get("id").cloned() else {
        // Notifications get no response body.
        debug!(method, "JSON-RPC notification");
        return StatusCode::ACCEPTED.into_response();
    };

    let response = match method {
        "initialize" => RpcResponse::result(id, initialize_result()),
        "ping" => RpcResponse::result(id, json!({})),
        "tools/list" => RpcResponse::result(id, json!({ "tools": tools::catalogue() })),
        "tools/call" if !state.auth.allows(&headers, &uri) => {
            warn!("Unauthenticated tools/call");
            RpcResponse::error(id, UNAUTHORIZED, "Authentication required")
        }
        "tools/call" => {
            let params = request.get("params").cloned().unwrap_or(Value::Null);
            let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            match tools::call(&state.control, name, &arguments).await {
                Some(result) => RpcResponse::result(id, tool_content(&result)),
                None => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Tool not found: {name}")),
            }
        }
        _ => RpcResponse::error(id, METHOD_NOT_FOUND, "Method not found"),
    };
    Json(response).into_response()
}

/// `GET /mcp/tools`
pub async fn list_tools() -> Json<Value> {
    Json(json!({ "tools": tools::catalogue() }))
}

/// `POST /mcp/call` with `{"tool": .., "params": {..}}`.
pub async fn call_tool(_: Authorized, State(state): State<AppState>, body: String) -> Json<ToolResult> {
    let request: Value = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(_) => {
            return Json(ToolResult::Error {
                message: "Invalid JSON request body".to_string(),
            })
        }
    };

    let name = request.get("tool").and_then(Value::as_str).unwrap_or_default();
    let arguments = request.get("params").cloned().unwrap_or_else(|| json!({}));
    let result = tools::call(&state.control, name, &arguments)
        .await
        .unwrap_or_else(|| ToolResult::Error {
            message: format!("Unknown tool: {name}"),
        });
    Json(result)
}
