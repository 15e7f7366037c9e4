use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::{
    surface::ToolSurface,
    types::{
        INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, RpcId, RpcRequest,
        RpcResponse, ToolCallParams, ToolCallResult,
    },
};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "act-tools";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Read newline-delimited JSON-RPC 2.0 requests from `reader` and write one
/// response line per request to `writer`, until the input channel closes.
///
/// This is the agent channel's framing (SPEC_FULL.md §6): a minimal subset
/// (`initialize`, `tools/list`, `tools/call`, `ping`) sufficient to host the
/// tool catalogue without depending on any particular agent runtime.
pub async fn serve<R, W>(surface: &ToolSurface, reader: R, mut writer: W)
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "agent channel read error, closing");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(surface, &line).await;
        if let Some(response) = response {
            let Ok(mut text) = serde_json::to_string(&response) else {
                warn!("failed to serialize rpc response");
                continue;
            };
            text.push('\n');
            if writer.write_all(text.as_bytes()).await.is_err() || writer.flush().await.is_err() {
                warn!("agent channel write error, closing");
                break;
            }
        }
    }
}

async fn handle_line(surface: &ToolSurface, line: &str) -> Option<RpcResponse> {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            debug!(%err, "malformed rpc request");
            return Some(RpcResponse::error(RpcId::Null, PARSE_ERROR, format!("parse error: {err}")));
        }
    };

    // A request with no id is a notification; acknowledge nothing.
    let Some(id) = request.id else {
        return None;
    };

    let response = match request.method.as_str() {
        "initialize" => handle_initialize(id),
        "tools/list" => handle_tools_list(surface, id),
        "tools/call" => handle_tools_call(surface, id, request.params).await,
        "ping" => RpcResponse::success(id, json!({"pong": true})),
        other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("method not found: {other}")),
    };
    Some(response)
}

fn handle_initialize(id: RpcId) -> RpcResponse {
    RpcResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        }),
    )
}

fn handle_tools_list(surface: &ToolSurface, id: RpcId) -> RpcResponse {
    let tools = surface.catalog();
    RpcResponse::success(id, json!({"tools": tools}))
}

async fn handle_tools_call(surface: &ToolSurface, id: RpcId, params: Option<Value>) -> RpcResponse {
    let params: ToolCallParams = match params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(params) => params,
        None => return RpcResponse::error(id, INVALID_PARAMS, "missing or invalid params"),
    };
    let arguments = params.arguments.unwrap_or_else(|| json!({}));

    match surface.call(&params.name, arguments).await {
        Ok(value) => RpcResponse::success(id, serde_json::to_value(ToolCallResult::ok(value)).unwrap_or_else(|_| json!(null))),
        Err(err) => {
            let result = ToolCallResult::failed(err.agent_message());
            match serde_json::to_value(result) {
                Ok(value) => RpcResponse::success(id, value),
                Err(err) => RpcResponse::error(id, INTERNAL_ERROR, err.to_string()),
            }
        }
    }
}
