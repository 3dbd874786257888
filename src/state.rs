//! The live session model.
//!
//! One [`GameState`] exists per process. It is created at startup, shared
//! by every worker and the control surface, and its contents are reset at
//! the start of each session. All access goes through the read-write lock;
//! no I/O happens while a guard is held, and everything returned to a
//! caller is an owned copy.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use realmgate_protocol::types::{BlockPos, GameData, GameMode, ItemInstance, Vec3};
use realmgate_protocol::Connection;
use time::OffsetDateTime;

/// How many chat entries are retained.
pub const CHAT_HISTORY_CAP: usize = 100;

/// Where a session currently is in its lifecycle.
///
/// `Disconnected` is never terminal for the process; the listener loop
/// moves back to `WaitingForClient` for the next session.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Status {
    #[default]
    Starting,
    WaitingForClient,
    ConnectingToRealm,
    Connected,
    Disconnected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Starting => "starting",
            Status::WaitingForClient => "waiting_for_client",
            Status::ConnectingToRealm => "connecting_to_realm",
            Status::Connected => "connected",
            Status::Disconnected => "disconnected",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ChatDirection {
    Incoming,
    Outgoing,
}

impl ChatDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatDirection::Incoming => "incoming",
            ChatDirection::Outgoing => "outgoing",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct ChatEntry {
    pub timestamp: OffsetDateTime,
    pub source: String,
    pub message: String,
    pub direction: ChatDirection,
}

impl ChatEntry {
    /// Stamps an entry with the current wall clock, preferring the local
    /// offset.
    pub fn now(source: impl Into<String>, message: impl Into<String>, direction: ChatDirection) -> Self {
        let timestamp = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self {
            timestamp,
            source: source.into(),
            message: message.into(),
            direction,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Player {
    pub username: String,
    pub user_id: String,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Entity {
    pub runtime_id: u64,
    /// The actor type, or the username for other players.
    pub kind: String,
    pub position: Vec3,
}

/// A point-in-time copy of the local player's position.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub dimension: i32,
}

/// One occupied inventory slot as reported to the control surface.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InventoryItem {
    pub slot: u32,
    pub name: String,
    pub count: u16,
}

/// A point-in-time copy of the world metadata.
#[derive(Clone, PartialEq, Debug)]
pub struct WorldInfo {
    pub world_name: String,
    pub time: i64,
    pub game_mode: GameMode,
    pub health: f32,
    pub spawn: BlockPos,
}

#[derive(Default)]
struct SessionData {
    status: Status,

    upstream: Option<Arc<Connection>>,
    local: Option<Arc<Connection>>,

    display_name: String,
    user_id: String,
    runtime_id: u64,

    x: f32,
    y: f32,
    z: f32,
    pitch: f32,
    yaw: f32,
    dimension: i32,

    inventory: HashMap<u32, Vec<ItemInstance>>,
    items: HashMap<i32, String>,
    blocks: HashMap<u32, String>,

    chat: VecDeque<ChatEntry>,
    players: HashMap<String, Player>,
    entities: HashMap<u64, Entity>,
    attributes: HashMap<String, f32>,

    world_name: String,
    world_time: i64,
    game_mode: GameMode,
    health: f32,
    spawn: BlockPos,
}

/// The process-wide session snapshot. See the module docs for the access
/// discipline.
#[derive(Default)]
pub struct GameState {
    inner: RwLock<SessionData>,
    verbose: AtomicBool,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.inner.read().status
    }

    pub fn set_status(&self, status: Status) {
        self.inner.write().status = status;
    }

    /// Stores the session's connection handles. The session engine keeps
    /// ownership; these are collaborator references cleared at teardown.
    pub fn set_connections(&self, upstream: Arc<Connection>, local: Arc<Connection>) {
        let mut data = self.inner.write();
        data.upstream = Some(upstream);
        data.local = Some(local);
    }

    pub fn clear_connections(&self) {
        let mut data = self.inner.write();
        data.upstream = None;
        data.local = None;
    }

    /// The upstream handle, if a session is live.
    pub fn upstream(&self) -> Option<Arc<Connection>> {
        self.inner.read().upstream.clone()
    }

    /// The local client handle, if a session is live.
    pub fn local(&self) -> Option<Arc<Connection>> {
        self.inner.read().local.clone()
    }

    pub fn set_identity(&self, display_name: &str, user_id: &str, runtime_id: u64) {
        let mut data = self.inner.write();
        data.display_name = display_name.to_owned();
        data.user_id = user_id.to_owned();
        data.runtime_id = runtime_id;
    }

    pub fn clear_identity(&self) {
        let mut data = self.inner.write();
        data.display_name.clear();
        data.user_id.clear();
        data.runtime_id = 0;
    }

    /// `(display_name, user_id)` of the local player.
    pub fn identity(&self) -> (String, String) {
        let data = self.inner.read();
        (data.display_name.clone(), data.user_id.clone())
    }

    /// The entity runtime id the upstream assigned to the local player.
    /// Matching against this is the only "this is us" test.
    pub fn runtime_id(&self) -> u64 {
        self.inner.read().runtime_id
    }

    pub fn update_position(&self, x: f32, y: f32, z: f32, pitch: f32, yaw: f32) {
        let mut data = self.inner.write();
        data.x = x;
        data.y = y;
        data.z = z;
        data.pitch = pitch;
        data.yaw = yaw;
    }

    pub fn set_dimension(&self, dimension: i32) {
        self.inner.write().dimension = dimension;
    }

    pub fn position(&self) -> Position {
        let data = self.inner.read();
        Position {
            x: data.x,
            y: data.y,
            z: data.z,
            pitch: data.pitch,
            yaw: data.yaw,
            dimension: data.dimension,
        }
    }

    /// Replaces the full contents of one inventory window.
    pub fn set_inventory(&self, window_id: u32, items: Vec<ItemInstance>) {
        self.inner.write().inventory.insert(window_id, items);
    }

    /// Replaces a single slot, growing the window as needed so that its
    /// length is at least `slot + 1` afterwards.
    pub fn update_inventory_slot(&self, window_id: u32, slot: u32, item: ItemInstance) {
        let mut data = self.inner.write();
        let window = data.inventory.entry(window_id).or_default();

        let slot = slot as usize;
        if window.len() <= slot {
            window.resize(slot + 1, ItemInstance::EMPTY);
        }
        window[slot] = item;
    }

    /// Every occupied slot across all windows, with resolved item names.
    /// Empty slots are skipped; ordering is unspecified.
    pub fn inventory(&self) -> Vec<InventoryItem> {
        let data = self.inner.read();
        let mut out = vec![];

        for window in data.inventory.values() {
            for (slot, item) in window.iter().enumerate() {
                if item.is_empty() {
                    continue;
                }
                out.push(InventoryItem {
                    slot: slot as u32,
                    name: resolve_item(&data.items, item.network_id),
                    count: item.count,
                });
            }
        }

        out
    }

    /// Resolves a per-session item handle. Never returns an empty name.
    pub fn item_name(&self, network_id: i32) -> String {
        resolve_item(&self.inner.read().items, network_id)
    }

    /// Resolves a block runtime id learned from observed placements.
    pub fn block_name(&self, runtime_id: u32) -> String {
        let data = self.inner.read();
        data.blocks
            .get(&runtime_id)
            .cloned()
            .unwrap_or_else(|| format!("rid:{runtime_id}"))
    }

    /// Records a block runtime id, unless the name itself is unresolved.
    pub fn learn_block(&self, runtime_id: u32, name: &str) {
        if name.starts_with("unknown:") {
            return;
        }
        self.inner
            .write()
            .blocks
            .insert(runtime_id, name.to_owned());
    }

    pub fn push_chat(&self, entry: ChatEntry) {
        let mut data = self.inner.write();
        data.chat.push_back(entry);
        while data.chat.len() > CHAT_HISTORY_CAP {
            data.chat.pop_front();
        }
    }

    /// The last `n` chat entries in insertion order, or all of them when
    /// `n` is non-positive or exceeds the history length.
    pub fn chat_history(&self, n: i64) -> Vec<ChatEntry> {
        let data = self.inner.read();
        let len = data.chat.len();

        let take = if n <= 0 { len } else { (n as usize).min(len) };

        data.chat.iter().skip(len - take).cloned().collect()
    }

    pub fn add_player(&self, user_id: &str, username: &str) {
        self.inner.write().players.insert(
            user_id.to_owned(),
            Player {
                username: username.to_owned(),
                user_id: user_id.to_owned(),
            },
        );
    }

    pub fn remove_player(&self, user_id: &str) {
        self.inner.write().players.remove(user_id);
    }

    pub fn players(&self) -> Vec<Player> {
        self.inner.read().players.values().cloned().collect()
    }

    pub fn set_world_time(&self, time: i64) {
        self.inner.write().world_time = time;
    }

    pub fn set_health(&self, health: f32) {
        let mut data = self.inner.write();
        data.health = health;
        data.attributes.insert("minecraft:health".to_owned(), health);
    }

    /// Sets a named attribute. `"minecraft:health"` is mirrored to the
    /// health field.
    pub fn set_attribute(&self, name: &str, value: f32) {
        let mut data = self.inner.write();
        data.attributes.insert(name.to_owned(), value);
        if name == "minecraft:health" {
            data.health = value;
        }
    }

    pub fn attribute(&self, name: &str) -> Option<f32> {
        self.inner.read().attributes.get(name).copied()
    }

    /// Seeds the session model from the upstream's game-data snapshot and
    /// discards whatever the previous session left behind.
    pub fn init_from_game_data(&self, game_data: &GameData) {
        let mut data = self.inner.write();

        data.world_name = game_data.world_name.clone();
        data.world_time = game_data.world_time;
        data.game_mode = game_data.game_mode;
        data.spawn = game_data.spawn;
        data.dimension = game_data.dimension;

        data.x = game_data.player_position.x;
        data.y = game_data.player_position.y;
        data.z = game_data.player_position.z;
        data.pitch = game_data.pitch;
        data.yaw = game_data.yaw;

        data.health = 20.0;

        data.items = game_data
            .items
            .iter()
            .map(|entry| (entry.network_id, entry.name.clone()))
            .collect();

        data.inventory.clear();
        data.blocks.clear();
        data.chat.clear();
        data.players.clear();
        data.entities.clear();
        data.attributes.clear();
    }

    pub fn add_entity(&self, runtime_id: u64, kind: &str, position: Vec3) {
        self.inner.write().entities.insert(
            runtime_id,
            Entity {
                runtime_id,
                kind: kind.to_owned(),
                position,
            },
        );
    }

    /// Moves a tracked entity. When the entity is the local player, the
    /// position fields follow along.
    pub fn update_entity_position(&self, runtime_id: u64, position: Vec3) {
        let mut data = self.inner.write();

        if let Some(entity) = data.entities.get_mut(&runtime_id) {
            entity.position = position;
        }

        if runtime_id == data.runtime_id && runtime_id != 0 {
            data.x = position.x;
            data.y = position.y;
            data.z = position.z;
        }
    }

    /// Removing an untracked entity is a no-op.
    pub fn remove_entity(&self, runtime_id: u64) {
        self.inner.write().entities.remove(&runtime_id);
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.inner.read().entities.values().cloned().collect()
    }

    pub fn world_info(&self) -> WorldInfo {
        let data = self.inner.read();
        WorldInfo {
            world_name: data.world_name.clone(),
            time: data.world_time,
            game_mode: data.game_mode,
            health: data.health,
            spawn: data.spawn,
        }
    }

    /// Whether verbose packet diagnostics are enabled. Affects logging
    /// only, never behaviour.
    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    pub fn set_verbose(&self, enabled: bool) {
        self.verbose.store(enabled, Ordering::Relaxed);
    }
}

fn resolve_item(items: &HashMap<i32, String>, network_id: i32) -> String {
    items
        .get(&network_id)
        .cloned()
        .unwrap_or_else(|| format!("unknown:{network_id}"))
}
