//! The tool channel: JSON-RPC 2.0 over stdio, one message per line.
//!
//! Controllers drive the proxy through `tools/call`; everything else here
//! is protocol lifecycle. Responses carry a single text content block —
//! JSON-serialized data for queries, a human-readable sentence for
//! actions.

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::control::{ControlError, ControlSurface};

const PROTOCOL_VERSION: &str = "2024-11-05";

const SERVER_NAME: &str = "realmgate";

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum RequestId {
    Number(i64),
    String(String),
}

#[derive(Serialize, Debug)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Serialize, Debug)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: RequestId, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// The stdio server. Runs until stdin closes, a shutdown request arrives,
/// or the process is cancelled.
pub struct McpServer {
    surface: ControlSurface,
    cancel: CancellationToken,
    shutdown_requested: bool,
}

impl McpServer {
    pub fn new(surface: ControlSurface, cancel: CancellationToken) -> Self {
        Self {
            surface,
            cancel,
            shutdown_requested: false,
        }
    }

    pub async fn run_stdio(&mut self) -> anyhow::Result<()> {
        info!("tool channel listening on stdio");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        loop {
            line.clear();

            let read = tokio::select! {
                _ = self.cancel.cancelled() => break,
                read = reader.read_line(&mut line) => read?,
            };

            if read == 0 {
                info!("stdin closed; tool channel shutting down");
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Value>(line) {
                Ok(msg) => self.handle_message(msg).await,
                Err(e) => {
                    error!("unparseable request: {e}");
                    Some(JsonRpcResponse::error(
                        RequestId::Number(0),
                        PARSE_ERROR,
                        e.to_string(),
                    ))
                }
            };

            if let Some(response) = response {
                let encoded = serde_json::to_string(&response)?;
                debug!("responding: {encoded}");
                stdout.write_all(encoded.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }

            if self.shutdown_requested {
                info!("shutdown requested over the tool channel");
                break;
            }
        }

        Ok(())
    }

    /// Dispatches one message. Notifications produce no response.
    async fn handle_message(&mut self, msg: Value) -> Option<JsonRpcResponse> {
        let id = msg.get("id").map(parse_request_id);
        let params = msg.get("params").cloned().unwrap_or_else(|| json!({}));

        let Some(method) = msg.get("method").and_then(Value::as_str) else {
            return id.map(|id| JsonRpcResponse::error(id, INVALID_REQUEST, "missing method"));
        };

        debug!(method, "handling request");

        let result = match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "initialized" | "notifications/initialized" => return None,
            "shutdown" => {
                self.shutdown_requested = true;
                Ok(json!({}))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tool_call(&params).await,
            other => {
                warn!("unknown method {other}");
                Err((METHOD_NOT_FOUND, format!("unknown method {other}")))
            }
        };

        let id = id.unwrap_or(RequestId::Number(0));

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        })
    }

    async fn handle_tool_call(&self, params: &Value) -> Result<Value, (i64, String)> {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Err((INVALID_PARAMS, "missing tool name".to_owned()));
        };

        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let outcome = self.dispatch_tool(name, &args).await;

        Ok(match outcome {
            Ok(text) => json!({
                "content": [{ "type": "text", "text": text }],
                "isError": false,
            }),
            Err(e) => json!({
                "content": [{ "type": "text", "text": e.to_string() }],
                "isError": true,
            }),
        })
    }

    async fn dispatch_tool(&self, name: &str, args: &Value) -> Result<String, ControlError> {
        match name {
            "get_status" => Ok(self.surface.get_status().to_string()),
            "get_position" => self.surface.get_position().map(|v| v.to_string()),
            "get_inventory" => self.surface.get_inventory().map(|v| v.to_string()),
            "get_players" => self.surface.get_players().map(|v| v.to_string()),
            "get_chat_history" => {
                let count = args.get("count").and_then(Value::as_i64).unwrap_or(0);
                self.surface.get_chat_history(count).map(|v| v.to_string())
            }
            "get_world_info" => self.surface.get_world_info().map(|v| v.to_string()),
            "chat" => {
                let message = require_str(args, "message")?;
                self.surface.chat(message)
            }
            "command" => {
                let command = require_str(args, "command")?;
                self.surface.command(command)
            }
            "teleport" => {
                let x = require_f64(args, "x")?;
                let y = require_f64(args, "y")?;
                let z = require_f64(args, "z")?;
                self.surface.teleport(x, y, z)
            }
            "upload_structure" => {
                let path = require_str(args, "path")?;
                let delay_ms = args.get("delay_ms").and_then(Value::as_u64).unwrap_or(50);

                // Request-scoped: process shutdown aborts the upload
                // between chunks.
                let cancel = self.cancel.child_token();
                self.surface.upload_structure(path, delay_ms, &cancel).await
            }
            "toggle_packet_logging" => {
                let enabled = args
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| missing("enabled"))?;
                Ok(self.surface.toggle_packet_logging(enabled))
            }
            other => Err(ControlError::InvalidArgument(format!(
                "unknown tool {other}"
            ))),
        }
    }
}

fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ControlError> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| missing(key))
}

fn require_f64(args: &Value, key: &str) -> Result<f64, ControlError> {
    args.get(key).and_then(Value::as_f64).ok_or_else(|| missing(key))
}

fn missing(key: &str) -> ControlError {
    ControlError::InvalidArgument(format!("missing required argument '{key}'"))
}

fn parse_request_id(value: &Value) -> RequestId {
    match value {
        Value::String(s) => RequestId::String(s.clone()),
        Value::Number(n) => RequestId::Number(n.as_i64().unwrap_or(0)),
        _ => RequestId::Number(0),
    }
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "get_status",
            "description": "Current proxy status.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "get_position",
            "description": "The player's position, rotation and dimension.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "get_inventory",
            "description": "Occupied inventory slots with resolved item names.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "get_players",
            "description": "Players currently online.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "get_chat_history",
            "description": "Recent chat, oldest first.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "count": {
                        "type": "number",
                        "description": "How many entries; 0 or omitted for all."
                    }
                }
            }
        },
        {
            "name": "get_world_info",
            "description": "World name, time, game mode, health and spawn point.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "chat",
            "description": "Send a chat message as the player.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "message": { "type": "string" }
                },
                "required": ["message"]
            }
        },
        {
            "name": "command",
            "description": "Run a slash command as the player.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "With or without the leading slash." }
                },
                "required": ["command"]
            }
        },
        {
            "name": "teleport",
            "description": "Teleport the player to coordinates.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "x": { "type": "number" },
                    "y": { "type": "number" },
                    "z": { "type": "number" }
                },
                "required": ["x", "y", "z"]
            }
        },
        {
            "name": "upload_structure",
            "description": "Stream a line-delimited structure file into the world as !chunk messages.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "delay_ms": {
                        "type": "number",
                        "description": "Pause between chunks; defaults to 50."
                    }
                },
                "required": ["path"]
            }
        },
        {
            "name": "toggle_packet_logging",
            "description": "Enable or disable verbose packet diagnostics.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "enabled": { "type": "boolean" }
                },
                "required": ["enabled"]
            }
        }
    ])
}
