//! Wire-level plumbing for the Bedrock proxy: encode/decode traits, the
//! packet codec with batch compression, typed packets for everything the
//! proxy inspects or synthesizes, and the connection type whose write half
//! is serialized behind a dedicated writer task.
//!
//! The proxy terminates both legs of the relay itself, so the codec only
//! has to agree with itself; nothing here claims bit-exactness against a
//! vanilla client.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_import_braces,
    unreachable_pub,
    clippy::dbg_macro
)]

pub mod conn;
pub mod decode;
pub mod encode;
mod impls;
pub mod packets;
pub mod types;
pub mod var_int;
pub mod var_long;

use std::io::Write;

pub use conn::{Connection, Listener, LoginInfo};
pub use decode::{PacketDecoder, PacketFrame};
pub use encode::PacketEncoder;
pub use types::{
    Attribute, BlockPos, GameData, GameMode, InputFlags, InputMode, InteractionModel, ItemEntry,
    ItemInstance, PlayMode, TextKind, Vec3,
};
pub use var_int::{VarInt, VarUint};
pub use var_long::{VarLong, VarUlong};

/// The maximum number of bytes in a single packet frame.
pub const MAX_PACKET_SIZE: usize = 2097152;

/// The protocol version stamped into the login exchange.
pub const PROTOCOL_VERSION: i32 = 712;

/// The game version string the proxy reports to either peer.
pub const GAME_VERSION: &str = "1.21.20";

/// How large a packet body must be before the encoder compresses it.
///
/// A non-negative threshold enables compression for bodies strictly larger
/// than the value; a negative threshold disables compression entirely.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CompressionThreshold(pub i32);

impl CompressionThreshold {
    /// No compression.
    pub const DISABLED: Self = Self(-1);

    /// The threshold both legs of the proxy use by default.
    pub const DEFAULT: Self = Self(256);
}

impl Default for CompressionThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Types that can be written to the wire.
///
/// Successful calls to [`encode`](Encode::encode) must round-trip through
/// [`Decode::decode`] consuming exactly the bytes that were written.
pub trait Encode {
    fn encode(&self, w: impl Write) -> anyhow::Result<()>;
}

/// Types that can be read from the wire. The inverse of [`Encode`].
///
/// Decoding borrows the input cursor and advances it past the bytes
/// consumed.
pub trait Decode: Sized {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self>;
}

/// A typed packet with a fixed id.
pub trait Packet {
    /// The leading varuint id of this packet.
    const ID: u32;

    /// The name of this packet for diagnostics.
    const NAME: &'static str;

    /// Writes the leading id followed by the body.
    fn encode_with_id(&self, mut w: impl Write) -> anyhow::Result<()>
    where
        Self: Encode,
    {
        VarUint(Self::ID).encode(&mut w)?;
        self.encode(w)
    }
}
