//! Value types shared between packets and the session model.

use std::fmt;
use std::io::Write;

use anyhow::bail;

use crate::var_int::{VarInt, VarUint};
use crate::var_long::{VarLong, VarUlong};
use crate::{Decode, Encode};

/// A position or direction in world space.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Encode for Vec3 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.x.encode(&mut w)?;
        self.y.encode(&mut w)?;
        self.z.encode(w)
    }
}

impl Decode for Vec3 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            x: f32::decode(r)?,
            y: f32::decode(r)?,
            z: f32::decode(r)?,
        })
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// An integer block position. The vertical coordinate is unsigned on the
/// wire.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct BlockPos {
    pub x: i32,
    pub y: u32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: u32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Encode for BlockPos {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.x).encode(&mut w)?;
        VarUint(self.y).encode(&mut w)?;
        VarInt(self.z).encode(w)
    }
}

impl Decode for BlockPos {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            x: VarInt::decode(r)?.0,
            y: VarUint::decode(r)?.0,
            z: VarInt::decode(r)?.0,
        })
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The game mode of the local player.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Survival => "survival",
            GameMode::Creative => "creative",
            GameMode::Adventure => "adventure",
            GameMode::Spectator => "spectator",
        }
    }
}

impl Encode for GameMode {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarInt(match self {
            GameMode::Survival => 0,
            GameMode::Creative => 1,
            GameMode::Adventure => 2,
            GameMode::Spectator => 3,
        })
        .encode(w)
    }
}

impl Decode for GameMode {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match VarInt::decode(r)?.0 {
            0 => GameMode::Survival,
            1 => GameMode::Creative,
            2 => GameMode::Adventure,
            3 | 6 => GameMode::Spectator,
            n => bail!("invalid game mode {n}"),
        })
    }
}

/// An item in an inventory window. A count of zero denotes an empty slot.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct ItemInstance {
    /// The per-session numeric handle for the item type.
    pub network_id: i32,
    pub count: u16,
}

impl ItemInstance {
    pub const EMPTY: Self = Self {
        network_id: 0,
        count: 0,
    };

    pub fn new(network_id: i32, count: u16) -> Self {
        Self { network_id, count }
    }

    pub fn is_empty(self) -> bool {
        self.count == 0
    }
}

impl Encode for ItemInstance {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.network_id).encode(&mut w)?;
        self.count.encode(w)
    }
}

impl Decode for ItemInstance {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            network_id: VarInt::decode(r)?.0,
            count: u16::decode(r)?,
        })
    }
}

/// A named attribute of an entity, health included.
#[derive(Clone, PartialEq, Debug)]
pub struct Attribute {
    pub name: String,
    pub min: f32,
    pub max: f32,
    pub value: f32,
}

impl Encode for Attribute {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.name.encode(&mut w)?;
        self.min.encode(&mut w)?;
        self.max.encode(&mut w)?;
        self.value.encode(w)
    }
}

impl Decode for Attribute {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            name: String::decode(r)?,
            min: f32::decode(r)?,
            max: f32::decode(r)?,
            value: f32::decode(r)?,
        })
    }
}

/// One entry of the item-type manifest carried by the start-game exchange.
#[derive(Clone, PartialEq, Debug)]
pub struct ItemEntry {
    pub network_id: i32,
    pub name: String,
}

impl Encode for ItemEntry {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.network_id).encode(&mut w)?;
        self.name.encode(w)
    }
}

impl Decode for ItemEntry {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            network_id: VarInt::decode(r)?.0,
            name: String::decode(r)?,
        })
    }
}

/// The text-packet kind discriminant.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TextKind {
    Raw,
    Chat,
    Translation,
    Popup,
    JukeboxPopup,
    Tip,
    System,
    Whisper,
    Announcement,
}

impl Encode for TextKind {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        (match self {
            TextKind::Raw => 0u8,
            TextKind::Chat => 1,
            TextKind::Translation => 2,
            TextKind::Popup => 3,
            TextKind::JukeboxPopup => 4,
            TextKind::Tip => 5,
            TextKind::System => 6,
            TextKind::Whisper => 7,
            TextKind::Announcement => 8,
        })
        .encode(w)
    }
}

impl Decode for TextKind {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match u8::decode(r)? {
            0 => TextKind::Raw,
            1 => TextKind::Chat,
            2 => TextKind::Translation,
            3 => TextKind::Popup,
            4 => TextKind::JukeboxPopup,
            5 => TextKind::Tip,
            6 => TextKind::System,
            7 => TextKind::Whisper,
            8 => TextKind::Announcement,
            n => bail!("invalid text kind {n}"),
        })
    }
}

/// The authoritative-input flag bitset, wide enough for every flag the
/// current protocol defines. Encoded as two varulongs.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct InputFlags {
    pub lo: u64,
    pub hi: u64,
}

impl InputFlags {
    pub const EMPTY: Self = Self { lo: 0, hi: 0 };
}

impl Encode for InputFlags {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUlong(self.lo).encode(&mut w)?;
        VarUlong(self.hi).encode(w)
    }
}

impl Decode for InputFlags {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            lo: VarUlong::decode(r)?.0,
            hi: VarUlong::decode(r)?.0,
        })
    }
}

/// How the player is providing input.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InputMode {
    Mouse,
    Touch,
    GamePad,
    MotionController,
}

impl Encode for InputMode {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarUint(match self {
            InputMode::Mouse => 1,
            InputMode::Touch => 2,
            InputMode::GamePad => 3,
            InputMode::MotionController => 4,
        })
        .encode(w)
    }
}

impl Decode for InputMode {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match VarUint::decode(r)?.0 {
            1 => InputMode::Mouse,
            2 => InputMode::Touch,
            3 => InputMode::GamePad,
            4 => InputMode::MotionController,
            n => bail!("invalid input mode {n}"),
        })
    }
}

/// Whether the client is playing normally or through a screen.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PlayMode {
    Normal,
    Teaser,
    Screen,
    Viewer,
    Reality,
}

impl Encode for PlayMode {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarUint(match self {
            PlayMode::Normal => 0,
            PlayMode::Teaser => 1,
            PlayMode::Screen => 2,
            PlayMode::Viewer => 3,
            PlayMode::Reality => 4,
        })
        .encode(w)
    }
}

impl Decode for PlayMode {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match VarUint::decode(r)?.0 {
            0 => PlayMode::Normal,
            1 => PlayMode::Teaser,
            2 => PlayMode::Screen,
            3 => PlayMode::Viewer,
            4 => PlayMode::Reality,
            n => bail!("invalid play mode {n}"),
        })
    }
}

/// How the client expects block/entity interactions to be resolved.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InteractionModel {
    Touch,
    Crosshair,
    Classic,
}

impl Encode for InteractionModel {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarUint(match self {
            InteractionModel::Touch => 0,
            InteractionModel::Crosshair => 1,
            InteractionModel::Classic => 2,
        })
        .encode(w)
    }
}

impl Decode for InteractionModel {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match VarUint::decode(r)?.0 {
            0 => InteractionModel::Touch,
            1 => InteractionModel::Crosshair,
            2 => InteractionModel::Classic,
            n => bail!("invalid interaction model {n}"),
        })
    }
}

/// The game-data snapshot the upstream hands out at the start of a session.
///
/// The proxy replays this to the local client verbatim and seeds its session
/// model from it.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct GameData {
    pub world_name: String,
    /// The runtime id the upstream assigned to the local player.
    pub entity_runtime_id: u64,
    pub player_position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub dimension: i32,
    pub game_mode: GameMode,
    pub world_time: i64,
    pub spawn: BlockPos,
    /// The per-session item-type manifest.
    pub items: Vec<ItemEntry>,
}

impl Encode for GameData {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.world_name.encode(&mut w)?;
        VarUlong(self.entity_runtime_id).encode(&mut w)?;
        self.player_position.encode(&mut w)?;
        self.pitch.encode(&mut w)?;
        self.yaw.encode(&mut w)?;
        VarInt(self.dimension).encode(&mut w)?;
        self.game_mode.encode(&mut w)?;
        VarLong(self.world_time).encode(&mut w)?;
        self.spawn.encode(&mut w)?;
        self.items.encode(w)
    }
}

impl Decode for GameData {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            world_name: String::decode(r)?,
            entity_runtime_id: VarUlong::decode(r)?.0,
            player_position: Vec3::decode(r)?,
            pitch: f32::decode(r)?,
            yaw: f32::decode(r)?,
            dimension: VarInt::decode(r)?.0,
            game_mode: GameMode::decode(r)?,
            world_time: VarLong::decode(r)?.0,
            spawn: BlockPos::decode(r)?,
            items: Vec::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_data_round_trip() {
        let data = GameData {
            world_name: "My Realm".to_owned(),
            entity_runtime_id: 42,
            player_position: Vec3::new(0.5, 64.0, -12.0),
            pitch: 10.0,
            yaw: -90.0,
            dimension: 0,
            game_mode: GameMode::Creative,
            world_time: 6000,
            spawn: BlockPos::new(8, 70, -3),
            items: vec![
                ItemEntry {
                    network_id: 1,
                    name: "minecraft:stone".to_owned(),
                },
                ItemEntry {
                    network_id: 5,
                    name: "minecraft:oak_planks".to_owned(),
                },
            ],
        };

        let mut buf = vec![];
        data.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        assert_eq!(GameData::decode(&mut slice).unwrap(), data);
        assert!(slice.is_empty());
    }

    #[test]
    fn block_pos_negative_coordinates() {
        let pos = BlockPos::new(-1024, 5, -1);

        let mut buf = vec![];
        pos.encode(&mut buf).unwrap();
        assert_eq!(BlockPos::decode(&mut buf.as_slice()).unwrap(), pos);
    }
}
