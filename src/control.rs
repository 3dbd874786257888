//! The query and action operations exposed over the tool channel.
//!
//! Queries read the session model; actions write to the upstream handle
//! stored in it. Every operation is independent: no retries, no streaming,
//! and no partial effects except for structure upload, which reports how
//! far it got.

use std::sync::Arc;
use std::time::Duration;

use realmgate_protocol::packets::Text;
use realmgate_protocol::types::TextKind;
use realmgate_protocol::Connection;
use serde_json::{json, Value};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tokio_util::sync::CancellationToken;

use crate::state::{GameState, Status};

/// What a failed operation reports to the controller. Callers match on the
/// prefix of the rendered message.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("NotConnected: no active session")]
    NotConnected,

    #[error("ConnectionUnavailable: server connection not available")]
    ConnectionUnavailable,

    #[error("WriteFailed: {0}")]
    WriteFailed(String),

    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    #[error("UpstreamUnreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// The flat operation set. One instance serves the whole process.
pub struct ControlSurface {
    state: Arc<GameState>,
}

impl ControlSurface {
    pub fn new(state: Arc<GameState>) -> Self {
        Self { state }
    }

    /// The only query that answers in every status.
    pub fn get_status(&self) -> Value {
        json!({ "status": self.state.status().as_str() })
    }

    pub fn get_position(&self) -> Result<Value, ControlError> {
        self.require_connected()?;

        let pos = self.state.position();
        Ok(json!({
            "x": pos.x,
            "y": pos.y,
            "z": pos.z,
            "pitch": pos.pitch,
            "yaw": pos.yaw,
            "dimension": pos.dimension,
        }))
    }

    pub fn get_inventory(&self) -> Result<Value, ControlError> {
        self.require_connected()?;

        let items: Vec<Value> = self
            .state
            .inventory()
            .into_iter()
            .map(|item| {
                json!({
                    "slot": item.slot,
                    "item": item.name,
                    "count": item.count,
                })
            })
            .collect();

        Ok(Value::Array(items))
    }

    pub fn get_players(&self) -> Result<Value, ControlError> {
        self.require_connected()?;

        let players: Vec<Value> = self
            .state
            .players()
            .into_iter()
            .map(|p| json!({ "username": p.username, "user_id": p.user_id }))
            .collect();

        Ok(Value::Array(players))
    }

    pub fn get_chat_history(&self, count: i64) -> Result<Value, ControlError> {
        self.require_connected()?;

        let entries: Vec<Value> = self
            .state
            .chat_history(count)
            .into_iter()
            .map(|entry| {
                json!({
                    "time": entry
                        .timestamp
                        .format(&Rfc3339)
                        .unwrap_or_else(|_| entry.timestamp.to_string()),
                    "source": entry.source,
                    "message": entry.message,
                    "direction": entry.direction.as_str(),
                })
            })
            .collect();

        Ok(Value::Array(entries))
    }

    pub fn get_world_info(&self) -> Result<Value, ControlError> {
        self.require_connected()?;

        let info = self.state.world_info();
        Ok(json!({
            "world_name": info.world_name,
            "time": info.time,
            "game_mode": info.game_mode.as_str(),
            "health": info.health,
            "spawn": {
                "x": info.spawn.x,
                "y": info.spawn.y,
                "z": info.spawn.z,
            },
        }))
    }

    /// Sends a chat message under the session's own identity.
    pub fn chat(&self, message: &str) -> Result<String, ControlError> {
        if message.is_empty() {
            return Err(ControlError::InvalidArgument(
                "message must not be empty".to_owned(),
            ));
        }

        self.send_chat(message)?;
        Ok(format!("sent: {message}"))
    }

    /// Runs a slash command. Commands travel the chat path on purpose: the
    /// hosting platform trips its packet validation on the native
    /// command-request kind, while slash-prefixed chat is evaluated
    /// equivalently.
    pub fn command(&self, cmd: &str) -> Result<String, ControlError> {
        let cmd = cmd.trim_start_matches('/');
        if cmd.is_empty() {
            return Err(ControlError::InvalidArgument(
                "command must not be empty".to_owned(),
            ));
        }

        self.send_chat(&format!("/{cmd}"))?;
        Ok(format!("ran: /{cmd}"))
    }

    pub fn teleport(&self, x: f64, y: f64, z: f64) -> Result<String, ControlError> {
        self.command(&format!("tp @s {x} {y} {z}"))
    }

    /// Streams a line-delimited structure file into the world, one chunk
    /// line per chat message, pausing `delay_ms` between lines.
    pub async fn upload_structure(
        &self,
        path: &str,
        delay_ms: u64,
        cancel: &CancellationToken,
    ) -> Result<String, ControlError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ControlError::InvalidArgument(format!("cannot read {path}: {e}")))?;

        let chunks: Vec<&str> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if chunks.is_empty() {
            return Err(ControlError::InvalidArgument(format!(
                "{path} contains no chunks"
            )));
        }

        let total = chunks.len();

        for (index, chunk) in chunks.iter().enumerate() {
            self.send_chat(&format!("!chunk {chunk}"))
                .map_err(|e| match e {
                    ControlError::WriteFailed(msg) => ControlError::WriteFailed(format!(
                        "chunk {} of {total}: {msg}",
                        index + 1
                    )),
                    other => other,
                })?;

            if index + 1 < total {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(ControlError::Cancelled(format!(
                            "sent {} of {total} chunks",
                            index + 1
                        )));
                    }
                    _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                }
            }
        }

        Ok(format!("uploaded {total} chunks from {path}"))
    }

    /// Toggles verbose packet diagnostics at runtime.
    pub fn toggle_packet_logging(&self, enabled: bool) -> String {
        self.state.set_verbose(enabled);
        format!(
            "packet logging {}",
            if enabled { "enabled" } else { "disabled" }
        )
    }

    fn require_connected(&self) -> Result<(), ControlError> {
        match self.state.status() {
            Status::Connected => Ok(()),
            _ => Err(ControlError::NotConnected),
        }
    }

    fn upstream(&self) -> Result<Arc<Connection>, ControlError> {
        self.require_connected()?;
        self.state
            .upstream()
            .ok_or(ControlError::ConnectionUnavailable)
    }

    fn send_chat(&self, message: &str) -> Result<(), ControlError> {
        let upstream = self.upstream()?;
        let (display_name, user_id) = self.state.identity();

        upstream
            .write_packet(&Text {
                kind: TextKind::Chat,
                needs_translation: false,
                source: display_name,
                message: message.to_owned(),
                xuid: user_id,
                platform_chat_id: String::new(),
            })
            .map_err(|e| ControlError::WriteFailed(e.to_string()))
    }
}
