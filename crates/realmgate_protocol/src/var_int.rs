use std::io::{Read, Write};

use anyhow::bail;
use byteorder::ReadBytesExt;
use thiserror::Error;

use crate::{Decode, Encode};

/// A `u32` encoded as a little-endian base-128 varint.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct VarUint(pub u32);

impl VarUint {
    /// The maximum number of bytes a varuint occupies on the wire.
    pub const MAX_SIZE: usize = 5;

    /// Returns the exact number of bytes this varuint will write when
    /// [`Encode::encode`] is called, assuming no error occurs.
    pub fn written_size(self) -> usize {
        match self.0 {
            0 => 1,
            n => (31 - n.leading_zeros() as usize) / 7 + 1,
        }
    }

    /// Decodes a varuint from a reader that may end mid-value, which the
    /// frame decoder uses to detect an incomplete length prefix.
    pub fn decode_partial(mut r: impl Read) -> Result<u32, VarIntDecodeError> {
        let mut val = 0;
        for i in 0..Self::MAX_SIZE {
            let byte = r.read_u8().map_err(|_| VarIntDecodeError::Incomplete)?;
            val |= u32::from(byte & 0x7f) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(val);
            }
        }

        Err(VarIntDecodeError::TooLarge)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum VarIntDecodeError {
    #[error("incomplete varint decode")]
    Incomplete,
    #[error("varint is too large")]
    TooLarge,
}

impl Encode for VarUint {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        let mut n = self.0;
        loop {
            let byte = (n & 0x7f) as u8;
            n >>= 7;
            if n == 0 {
                w.write_all(&[byte])?;
                return Ok(());
            }
            w.write_all(&[byte | 0x80])?;
        }
    }
}

impl Decode for VarUint {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let mut val = 0;
        for i in 0..Self::MAX_SIZE {
            let byte = r.read_u8()?;
            val |= u32::from(byte & 0x7f) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(VarUint(val));
            }
        }
        bail!("varuint is too large")
    }
}

impl From<u32> for VarUint {
    fn from(n: u32) -> Self {
        VarUint(n)
    }
}

impl From<VarUint> for u32 {
    fn from(n: VarUint) -> Self {
        n.0
    }
}

/// An `i32` encoded as a zigzag varint.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct VarInt(pub i32);

impl Encode for VarInt {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        let zigzag = ((self.0 << 1) ^ (self.0 >> 31)) as u32;
        VarUint(zigzag).encode(w)
    }
}

impl Decode for VarInt {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let zigzag = VarUint::decode(r)?.0;
        Ok(VarInt(((zigzag >> 1) as i32) ^ -((zigzag & 1) as i32)))
    }
}

impl From<i32> for VarInt {
    fn from(n: i32) -> Self {
        VarInt(n)
    }
}

impl From<VarInt> for i32 {
    fn from(n: VarInt) -> Self {
        n.0
    }
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;

    #[test]
    fn varuint_written_size() {
        let mut rng = thread_rng();
        let mut buf = vec![];

        for n in (0..100_000)
            .map(|_| rng.gen())
            .chain([0, u32::MAX])
            .map(VarUint)
        {
            buf.clear();
            n.encode(&mut buf).unwrap();
            assert_eq!(buf.len(), n.written_size());
        }
    }

    #[test]
    fn varuint_round_trip() {
        let mut rng = thread_rng();
        let mut buf = vec![];

        for n in (0..100_000).map(|_| rng.gen()).chain([0, u32::MAX]) {
            VarUint(n).encode(&mut buf).unwrap();

            let mut slice = buf.as_slice();
            assert!(slice.len() <= VarUint::MAX_SIZE);
            assert_eq!(n, VarUint::decode(&mut slice).unwrap().0);
            assert!(slice.is_empty());
            buf.clear();
        }
    }

    #[test]
    fn varint_round_trip() {
        let mut rng = thread_rng();
        let mut buf = vec![];

        for n in (0..100_000)
            .map(|_| rng.gen())
            .chain([0, -1, i32::MIN, i32::MAX])
        {
            VarInt(n).encode(&mut buf).unwrap();

            let mut slice = buf.as_slice();
            assert_eq!(n, VarInt::decode(&mut slice).unwrap().0);
            assert!(slice.is_empty());
            buf.clear();
        }
    }

    #[test]
    fn varint_small_values_stay_small() {
        let mut buf = vec![];
        VarInt(-1).encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 1);

        buf.clear();
        VarInt(63).encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 1);
    }
}
