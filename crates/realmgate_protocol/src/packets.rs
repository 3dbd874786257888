//! Every packet the proxy inspects, synthesizes, or exchanges during the
//! handshake. Anything not listed here flows through the relay as an opaque
//! frame.

use std::io::Write;

use anyhow::bail;

use crate::types::{
    Attribute, BlockPos, GameData, InputFlags, InputMode, InteractionModel, ItemInstance, PlayMode,
    TextKind, Vec3,
};
use crate::var_int::{VarInt, VarUint};
use crate::var_long::{VarLong, VarUlong};
use crate::{Decode, Encode, Packet};

/// Packet ids, by convention of the upstream protocol.
pub mod packet_id {
    pub const LOGIN: u32 = 0x01;
    pub const PLAY_STATUS: u32 = 0x02;
    pub const TEXT: u32 = 0x09;
    pub const SET_TIME: u32 = 0x0a;
    pub const START_GAME: u32 = 0x0b;
    pub const ADD_PLAYER: u32 = 0x0c;
    pub const ADD_ACTOR: u32 = 0x0d;
    pub const REMOVE_ACTOR: u32 = 0x0e;
    pub const MOVE_PLAYER: u32 = 0x13;
    pub const UPDATE_BLOCK: u32 = 0x15;
    pub const LEVEL_EVENT: u32 = 0x19;
    pub const UPDATE_ATTRIBUTES: u32 = 0x1d;
    pub const INVENTORY_TRANSACTION: u32 = 0x1e;
    pub const MOB_EQUIPMENT: u32 = 0x1f;
    pub const PLAYER_ACTION: u32 = 0x24;
    pub const SET_HEALTH: u32 = 0x2a;
    pub const CONTAINER_OPEN: u32 = 0x2e;
    pub const CONTAINER_CLOSE: u32 = 0x2f;
    pub const INVENTORY_CONTENT: u32 = 0x31;
    pub const INVENTORY_SLOT: u32 = 0x32;
    pub const CHANGE_DIMENSION: u32 = 0x3d;
    pub const PLAYER_LIST: u32 = 0x3f;
    pub const COMMAND_REQUEST: u32 = 0x4d;
    pub const MOVE_ACTOR_DELTA: u32 = 0x6f;
    pub const SET_LOCAL_PLAYER_INITIALIZED: u32 = 0x71;
    pub const PLAYER_AUTH_INPUT: u32 = 0x90;
    pub const ITEM_STACK_RESPONSE: u32 = 0x94;
}

macro_rules! packet {
    ($ty:ident, $id:expr) => {
        impl Packet for $ty {
            const ID: u32 = $id;
            const NAME: &'static str = stringify!($ty);
        }
    };
}

/// The login the proxy exchanges on either leg. The identity chain of the
/// real protocol is collapsed to the fields the session needs; the proxy
/// accepts arbitrary clients.
#[derive(Clone, PartialEq, Debug)]
pub struct Login {
    pub protocol_version: i32,
    pub display_name: String,
    pub user_id: String,
}

packet!(Login, packet_id::LOGIN);

impl Encode for Login {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.protocol_version.encode(&mut w)?;
        self.display_name.encode(&mut w)?;
        self.user_id.encode(w)
    }
}

impl Decode for Login {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            protocol_version: i32::decode(r)?,
            display_name: String::decode(r)?,
            user_id: String::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PlayStatus {
    pub status: i32,
}

impl PlayStatus {
    pub const LOGIN_SUCCESS: i32 = 0;
    pub const LOGIN_FAILED: i32 = 1;
    pub const PLAYER_SPAWN: i32 = 3;
}

packet!(PlayStatus, packet_id::PLAY_STATUS);

impl Encode for PlayStatus {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.status.encode(w)
    }
}

impl Decode for PlayStatus {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            status: i32::decode(r)?,
        })
    }
}

/// Chat, whispers, tips, translations. The `kind` discriminant decides how
/// the client renders the message.
#[derive(Clone, PartialEq, Debug)]
pub struct Text {
    pub kind: TextKind,
    pub needs_translation: bool,
    pub source: String,
    pub message: String,
    pub xuid: String,
    pub platform_chat_id: String,
}

packet!(Text, packet_id::TEXT);

impl Encode for Text {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.kind.encode(&mut w)?;
        self.needs_translation.encode(&mut w)?;
        self.source.encode(&mut w)?;
        self.message.encode(&mut w)?;
        self.xuid.encode(&mut w)?;
        self.platform_chat_id.encode(w)
    }
}

impl Decode for Text {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            kind: TextKind::decode(r)?,
            needs_translation: bool::decode(r)?,
            source: String::decode(r)?,
            message: String::decode(r)?,
            xuid: String::decode(r)?,
            platform_chat_id: String::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SetTime {
    pub time: i32,
}

packet!(SetTime, packet_id::SET_TIME);

impl Encode for SetTime {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarInt(self.time).encode(w)
    }
}

impl Decode for SetTime {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            time: VarInt::decode(r)?.0,
        })
    }
}

/// The upstream's game-data snapshot, replayed verbatim to the local
/// client.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct StartGame {
    pub game_data: GameData,
}

packet!(StartGame, packet_id::START_GAME);

impl Encode for StartGame {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.game_data.encode(w)
    }
}

impl Decode for StartGame {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            game_data: GameData::decode(r)?,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct AddPlayer {
    pub user_id: String,
    pub username: String,
    pub runtime_id: u64,
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
}

packet!(AddPlayer, packet_id::ADD_PLAYER);

impl Encode for AddPlayer {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.user_id.encode(&mut w)?;
        self.username.encode(&mut w)?;
        VarUlong(self.runtime_id).encode(&mut w)?;
        self.position.encode(&mut w)?;
        self.pitch.encode(&mut w)?;
        self.yaw.encode(w)
    }
}

impl Decode for AddPlayer {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            user_id: String::decode(r)?,
            username: String::decode(r)?,
            runtime_id: VarUlong::decode(r)?.0,
            position: Vec3::decode(r)?,
            pitch: f32::decode(r)?,
            yaw: f32::decode(r)?,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct AddActor {
    pub runtime_id: u64,
    pub actor_type: String,
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
}

packet!(AddActor, packet_id::ADD_ACTOR);

impl Encode for AddActor {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUlong(self.runtime_id).encode(&mut w)?;
        self.actor_type.encode(&mut w)?;
        self.position.encode(&mut w)?;
        self.pitch.encode(&mut w)?;
        self.yaw.encode(w)
    }
}

impl Decode for AddActor {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            runtime_id: VarUlong::decode(r)?.0,
            actor_type: String::decode(r)?,
            position: Vec3::decode(r)?,
            pitch: f32::decode(r)?,
            yaw: f32::decode(r)?,
        })
    }
}

/// Removal is keyed by the actor's unique id, which hosts in practice set
/// equal to the runtime id.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RemoveActor {
    pub unique_id: i64,
}

packet!(RemoveActor, packet_id::REMOVE_ACTOR);

impl Encode for RemoveActor {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarLong(self.unique_id).encode(w)
    }
}

impl Decode for RemoveActor {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            unique_id: VarLong::decode(r)?.0,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct MovePlayer {
    pub runtime_id: u64,
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub head_yaw: f32,
    pub mode: u8,
    pub on_ground: bool,
}

packet!(MovePlayer, packet_id::MOVE_PLAYER);

impl Encode for MovePlayer {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUlong(self.runtime_id).encode(&mut w)?;
        self.position.encode(&mut w)?;
        self.pitch.encode(&mut w)?;
        self.yaw.encode(&mut w)?;
        self.head_yaw.encode(&mut w)?;
        self.mode.encode(&mut w)?;
        self.on_ground.encode(w)
    }
}

impl Decode for MovePlayer {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            runtime_id: VarUlong::decode(r)?.0,
            position: Vec3::decode(r)?,
            pitch: f32::decode(r)?,
            yaw: f32::decode(r)?,
            head_yaw: f32::decode(r)?,
            mode: u8::decode(r)?,
            on_ground: bool::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct UpdateBlock {
    pub position: BlockPos,
    pub block_runtime_id: u32,
    pub flags: u32,
    pub layer: u32,
}

packet!(UpdateBlock, packet_id::UPDATE_BLOCK);

impl Encode for UpdateBlock {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.position.encode(&mut w)?;
        VarUint(self.block_runtime_id).encode(&mut w)?;
        VarUint(self.flags).encode(&mut w)?;
        VarUint(self.layer).encode(w)
    }
}

impl Decode for UpdateBlock {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            position: BlockPos::decode(r)?,
            block_runtime_id: VarUint::decode(r)?.0,
            flags: VarUint::decode(r)?.0,
            layer: VarUint::decode(r)?.0,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct LevelEvent {
    pub event_id: i32,
    pub position: Vec3,
    pub data: i32,
}

packet!(LevelEvent, packet_id::LEVEL_EVENT);

impl Encode for LevelEvent {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.event_id).encode(&mut w)?;
        self.position.encode(&mut w)?;
        VarInt(self.data).encode(w)
    }
}

impl Decode for LevelEvent {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            event_id: VarInt::decode(r)?.0,
            position: Vec3::decode(r)?,
            data: VarInt::decode(r)?.0,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct UpdateAttributes {
    pub runtime_id: u64,
    pub attributes: Vec<Attribute>,
}

packet!(UpdateAttributes, packet_id::UPDATE_ATTRIBUTES);

impl Encode for UpdateAttributes {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUlong(self.runtime_id).encode(&mut w)?;
        self.attributes.encode(w)
    }
}

impl Decode for UpdateAttributes {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            runtime_id: VarUlong::decode(r)?.0,
            attributes: Vec::decode(r)?,
        })
    }
}

/// What the client did with the item it is holding.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum UseItemAction {
    ClickBlock,
    ClickAir,
    BreakBlock,
}

impl Encode for UseItemAction {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarUint(match self {
            UseItemAction::ClickBlock => 0,
            UseItemAction::ClickAir => 1,
            UseItemAction::BreakBlock => 2,
        })
        .encode(w)
    }
}

impl Decode for UseItemAction {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match VarUint::decode(r)?.0 {
            0 => UseItemAction::ClickBlock,
            1 => UseItemAction::ClickAir,
            2 => UseItemAction::BreakBlock,
            n => bail!("invalid use-item action {n}"),
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct UseItemTransaction {
    pub action: UseItemAction,
    pub block_pos: BlockPos,
    pub face: i32,
    pub hotbar_slot: i32,
    pub held_item: ItemInstance,
    pub block_runtime_id: u32,
}

impl Encode for UseItemTransaction {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.action.encode(&mut w)?;
        self.block_pos.encode(&mut w)?;
        VarInt(self.face).encode(&mut w)?;
        VarInt(self.hotbar_slot).encode(&mut w)?;
        self.held_item.encode(&mut w)?;
        VarUint(self.block_runtime_id).encode(w)
    }
}

impl Decode for UseItemTransaction {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            action: UseItemAction::decode(r)?,
            block_pos: BlockPos::decode(r)?,
            face: VarInt::decode(r)?.0,
            hotbar_slot: VarInt::decode(r)?.0,
            held_item: ItemInstance::decode(r)?,
            block_runtime_id: VarUint::decode(r)?.0,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum TransactionData {
    Normal,
    Mismatch,
    UseItem(UseItemTransaction),
}

#[derive(Clone, PartialEq, Debug)]
pub struct InventoryTransaction {
    pub legacy_request_id: i32,
    pub transaction: TransactionData,
}

packet!(InventoryTransaction, packet_id::INVENTORY_TRANSACTION);

impl Encode for InventoryTransaction {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.legacy_request_id).encode(&mut w)?;
        match &self.transaction {
            TransactionData::Normal => VarUint(0).encode(w),
            TransactionData::Mismatch => VarUint(1).encode(w),
            TransactionData::UseItem(use_item) => {
                VarUint(2).encode(&mut w)?;
                use_item.encode(w)
            }
        }
    }
}

impl Decode for InventoryTransaction {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let legacy_request_id = VarInt::decode(r)?.0;
        let transaction = match VarUint::decode(r)?.0 {
            0 => TransactionData::Normal,
            1 => TransactionData::Mismatch,
            2 => TransactionData::UseItem(UseItemTransaction::decode(r)?),
            n => bail!("invalid transaction type {n}"),
        };
        Ok(Self {
            legacy_request_id,
            transaction,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct MobEquipment {
    pub runtime_id: u64,
    pub item: ItemInstance,
    pub inventory_slot: u8,
    pub hotbar_slot: u8,
    pub window_id: u8,
}

packet!(MobEquipment, packet_id::MOB_EQUIPMENT);

impl Encode for MobEquipment {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUlong(self.runtime_id).encode(&mut w)?;
        self.item.encode(&mut w)?;
        self.inventory_slot.encode(&mut w)?;
        self.hotbar_slot.encode(&mut w)?;
        self.window_id.encode(w)
    }
}

impl Decode for MobEquipment {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            runtime_id: VarUlong::decode(r)?.0,
            item: ItemInstance::decode(r)?,
            inventory_slot: u8::decode(r)?,
            hotbar_slot: u8::decode(r)?,
            window_id: u8::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PlayerAction {
    pub runtime_id: u64,
    pub action: i32,
    pub position: BlockPos,
    pub face: i32,
}

packet!(PlayerAction, packet_id::PLAYER_ACTION);

impl Encode for PlayerAction {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUlong(self.runtime_id).encode(&mut w)?;
        VarInt(self.action).encode(&mut w)?;
        self.position.encode(&mut w)?;
        VarInt(self.face).encode(w)
    }
}

impl Decode for PlayerAction {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            runtime_id: VarUlong::decode(r)?.0,
            action: VarInt::decode(r)?.0,
            position: BlockPos::decode(r)?,
            face: VarInt::decode(r)?.0,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SetHealth {
    pub health: i32,
}

packet!(SetHealth, packet_id::SET_HEALTH);

impl Encode for SetHealth {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarInt(self.health).encode(w)
    }
}

impl Decode for SetHealth {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            health: VarInt::decode(r)?.0,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ContainerOpen {
    pub window_id: u8,
    pub container_type: u8,
    pub position: BlockPos,
    pub target_unique_id: i64,
}

packet!(ContainerOpen, packet_id::CONTAINER_OPEN);

impl Encode for ContainerOpen {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.window_id.encode(&mut w)?;
        self.container_type.encode(&mut w)?;
        self.position.encode(&mut w)?;
        VarLong(self.target_unique_id).encode(w)
    }
}

impl Decode for ContainerOpen {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            window_id: u8::decode(r)?,
            container_type: u8::decode(r)?,
            position: BlockPos::decode(r)?,
            target_unique_id: VarLong::decode(r)?.0,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ContainerClose {
    pub window_id: u8,
    pub server_initiated: bool,
}

packet!(ContainerClose, packet_id::CONTAINER_CLOSE);

impl Encode for ContainerClose {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.window_id.encode(&mut w)?;
        self.server_initiated.encode(w)
    }
}

impl Decode for ContainerClose {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            window_id: u8::decode(r)?,
            server_initiated: bool::decode(r)?,
        })
    }
}

/// Replaces the whole contents of one inventory window.
#[derive(Clone, PartialEq, Debug)]
pub struct InventoryContent {
    pub window_id: u32,
    pub items: Vec<ItemInstance>,
}

packet!(InventoryContent, packet_id::INVENTORY_CONTENT);

impl Encode for InventoryContent {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUint(self.window_id).encode(&mut w)?;
        self.items.encode(w)
    }
}

impl Decode for InventoryContent {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            window_id: VarUint::decode(r)?.0,
            items: Vec::decode(r)?,
        })
    }
}

/// Replaces a single slot of one inventory window.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct InventorySlot {
    pub window_id: u32,
    pub slot: u32,
    pub item: ItemInstance,
}

packet!(InventorySlot, packet_id::INVENTORY_SLOT);

impl Encode for InventorySlot {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUint(self.window_id).encode(&mut w)?;
        VarUint(self.slot).encode(&mut w)?;
        self.item.encode(w)
    }
}

impl Decode for InventorySlot {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            window_id: VarUint::decode(r)?.0,
            slot: VarUint::decode(r)?.0,
            item: ItemInstance::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ChangeDimension {
    pub dimension: i32,
    pub position: Vec3,
    pub respawn: bool,
}

packet!(ChangeDimension, packet_id::CHANGE_DIMENSION);

impl Encode for ChangeDimension {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.dimension).encode(&mut w)?;
        self.position.encode(&mut w)?;
        self.respawn.encode(w)
    }
}

impl Decode for ChangeDimension {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            dimension: VarInt::decode(r)?.0,
            position: Vec3::decode(r)?,
            respawn: bool::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PlayerListAction {
    Add,
    Remove,
}

#[derive(Clone, Default, PartialEq, Debug)]
pub struct PlayerListEntry {
    pub user_id: String,
    /// Only present for additions.
    pub username: String,
}

/// The upstream roster event. Removal entries carry only the user id.
#[derive(Clone, PartialEq, Debug)]
pub struct PlayerList {
    pub action: PlayerListAction,
    pub entries: Vec<PlayerListEntry>,
}

packet!(PlayerList, packet_id::PLAYER_LIST);

impl Encode for PlayerList {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self.action {
            PlayerListAction::Add => 0u8.encode(&mut w)?,
            PlayerListAction::Remove => 1u8.encode(&mut w)?,
        }

        VarUint(self.entries.len() as u32).encode(&mut w)?;
        for entry in &self.entries {
            entry.user_id.encode(&mut w)?;
            if self.action == PlayerListAction::Add {
                entry.username.encode(&mut w)?;
            }
        }
        Ok(())
    }
}

impl Decode for PlayerList {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let action = match u8::decode(r)? {
            0 => PlayerListAction::Add,
            1 => PlayerListAction::Remove,
            n => bail!("invalid player list action {n}"),
        };

        let len = VarUint::decode(r)?.0 as usize;
        let mut entries = Vec::with_capacity(len.min(r.len()));

        for _ in 0..len {
            let user_id = String::decode(r)?;
            let username = match action {
                PlayerListAction::Add => String::decode(r)?,
                PlayerListAction::Remove => String::new(),
            };
            entries.push(PlayerListEntry { user_id, username });
        }

        Ok(Self { action, entries })
    }
}

/// Defined for completeness of the id table. The proxy never emits this
/// kind: slash commands are routed through [`Text`] instead.
#[derive(Clone, PartialEq, Debug)]
pub struct CommandRequest {
    pub command: String,
    pub origin_kind: u32,
    pub request_id: String,
    pub internal: bool,
}

packet!(CommandRequest, packet_id::COMMAND_REQUEST);

impl Encode for CommandRequest {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.command.encode(&mut w)?;
        VarUint(self.origin_kind).encode(&mut w)?;
        self.request_id.encode(&mut w)?;
        self.internal.encode(w)
    }
}

impl Decode for CommandRequest {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            command: String::decode(r)?,
            origin_kind: VarUint::decode(r)?.0,
            request_id: String::decode(r)?,
            internal: bool::decode(r)?,
        })
    }
}

/// Incremental movement of a tracked actor.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct MoveActorDelta {
    pub runtime_id: u64,
    pub position: Vec3,
}

packet!(MoveActorDelta, packet_id::MOVE_ACTOR_DELTA);

impl Encode for MoveActorDelta {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUlong(self.runtime_id).encode(&mut w)?;
        self.position.encode(w)
    }
}

impl Decode for MoveActorDelta {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            runtime_id: VarUlong::decode(r)?.0,
            position: Vec3::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SetLocalPlayerInitialized {
    pub runtime_id: u64,
}

packet!(
    SetLocalPlayerInitialized,
    packet_id::SET_LOCAL_PLAYER_INITIALIZED
);

impl Encode for SetLocalPlayerInitialized {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarUlong(self.runtime_id).encode(w)
    }
}

impl Decode for SetLocalPlayerInitialized {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            runtime_id: VarUlong::decode(r)?.0,
        })
    }
}

/// The client-authoritative input tick. The upstream's liveness detector
/// keys off the cadence of these.
#[derive(Clone, PartialEq, Debug)]
pub struct PlayerAuthInput {
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub head_yaw: f32,
    pub flags: InputFlags,
    pub input_mode: InputMode,
    pub play_mode: PlayMode,
    pub interaction_model: InteractionModel,
    pub tick: u64,
}

packet!(PlayerAuthInput, packet_id::PLAYER_AUTH_INPUT);

impl Encode for PlayerAuthInput {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.position.encode(&mut w)?;
        self.pitch.encode(&mut w)?;
        self.yaw.encode(&mut w)?;
        self.head_yaw.encode(&mut w)?;
        self.flags.encode(&mut w)?;
        self.input_mode.encode(&mut w)?;
        self.play_mode.encode(&mut w)?;
        self.interaction_model.encode(&mut w)?;
        VarUlong(self.tick).encode(w)
    }
}

impl Decode for PlayerAuthInput {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            position: Vec3::decode(r)?,
            pitch: f32::decode(r)?,
            yaw: f32::decode(r)?,
            head_yaw: f32::decode(r)?,
            flags: InputFlags::decode(r)?,
            input_mode: InputMode::decode(r)?,
            play_mode: PlayMode::decode(r)?,
            interaction_model: InteractionModel::decode(r)?,
            tick: VarUlong::decode(r)?.0,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StackResponse {
    pub status: u8,
    pub request_id: i32,
}

impl Encode for StackResponse {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.status.encode(&mut w)?;
        VarInt(self.request_id).encode(w)
    }
}

impl Decode for StackResponse {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            status: u8::decode(r)?,
            request_id: VarInt::decode(r)?.0,
        })
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct ItemStackResponse {
    pub responses: Vec<StackResponse>,
}

packet!(ItemStackResponse, packet_id::ITEM_STACK_RESPONSE);

impl Encode for ItemStackResponse {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.responses.encode(w)
    }
}

impl Decode for ItemStackResponse {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            responses: Vec::decode(r)?,
        })
    }
}
