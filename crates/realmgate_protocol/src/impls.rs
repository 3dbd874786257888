//! `Encode`/`Decode` for primitives and std containers. Multi-byte
//! primitives are little-endian on this wire.

use std::io::Write;

use anyhow::{bail, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::var_int::VarUint;
use crate::{Decode, Encode, MAX_PACKET_SIZE};

impl Encode for bool {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u8(u8::from(*self))?)
    }
}

impl Decode for bool {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        match r.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            n => bail!("invalid boolean byte {n}"),
        }
    }
}

impl Encode for u8 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u8(*self)?)
    }
}

impl Decode for u8 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_u8()?)
    }
}

impl Encode for i8 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_i8(*self)?)
    }
}

impl Decode for i8 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_i8()?)
    }
}

impl Encode for u16 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u16::<LittleEndian>(*self)?)
    }
}

impl Decode for u16 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_u16::<LittleEndian>()?)
    }
}

impl Encode for i16 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_i16::<LittleEndian>(*self)?)
    }
}

impl Decode for i16 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_i16::<LittleEndian>()?)
    }
}

impl Encode for u32 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u32::<LittleEndian>(*self)?)
    }
}

impl Decode for u32 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_u32::<LittleEndian>()?)
    }
}

impl Encode for i32 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_i32::<LittleEndian>(*self)?)
    }
}

impl Decode for i32 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_i32::<LittleEndian>()?)
    }
}

impl Encode for u64 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u64::<LittleEndian>(*self)?)
    }
}

impl Decode for u64 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_u64::<LittleEndian>()?)
    }
}

impl Encode for i64 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_i64::<LittleEndian>(*self)?)
    }
}

impl Decode for i64 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_i64::<LittleEndian>()?)
    }
}

impl Encode for f32 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_f32::<LittleEndian>(*self)?)
    }
}

impl Decode for f32 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_f32::<LittleEndian>()?)
    }
}

impl Encode for f64 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_f64::<LittleEndian>(*self)?)
    }
}

impl Decode for f64 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_f64::<LittleEndian>()?)
    }
}

impl Encode for str {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        ensure!(
            self.len() <= MAX_PACKET_SIZE,
            "string of {} bytes exceeds maximum packet size",
            self.len()
        );

        VarUint(self.len() as u32).encode(&mut w)?;
        Ok(w.write_all(self.as_bytes())?)
    }
}

impl Encode for String {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_str().encode(w)
    }
}

impl Decode for String {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let len = VarUint::decode(r)?.0 as usize;
        ensure!(len <= r.len(), "string length of {len} exceeds remaining input");

        let (bytes, rest) = r.split_at(len);
        *r = rest;
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarUint(self.len() as u32).encode(&mut w)?;
        for item in self {
            item.encode(&mut w)?;
        }
        Ok(())
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let len = VarUint::decode(r)?.0 as usize;

        // Don't trust the remote length prefix farther than the input.
        let cap = len.min(r.len());
        let mut vec = Vec::with_capacity(cap);

        for _ in 0..len {
            vec.push(T::decode(r)?);
        }
        Ok(vec)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Some(t) => {
                true.encode(&mut w)?;
                t.encode(w)
            }
            None => false.encode(w),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(match bool::decode(r)? {
            true => Some(T::decode(r)?),
            false => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip() {
        let mut buf = vec![];
        "minecraft:stone".to_owned().encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        assert_eq!(String::decode(&mut slice).unwrap(), "minecraft:stone");
        assert!(slice.is_empty());
    }

    #[test]
    fn string_rejects_overrun_length() {
        // Length prefix of 200 with only three bytes of payload behind it.
        let mut buf = vec![];
        VarUint(200).encode(&mut buf).unwrap();
        buf.extend_from_slice(b"abc");

        assert!(String::decode(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn vec_rejects_overrun_length() {
        let mut buf = vec![];
        VarUint(u32::MAX).encode(&mut buf).unwrap();

        assert!(Vec::<u64>::decode(&mut buf.as_slice()).is_err());
    }
}
