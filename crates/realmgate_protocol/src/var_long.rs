use std::io::Write;

use anyhow::bail;
use byteorder::ReadBytesExt;

use crate::{Decode, Encode};

/// A `u64` encoded as a little-endian base-128 varint.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct VarUlong(pub u64);

impl VarUlong {
    pub const MAX_SIZE: usize = 10;
}

impl Encode for VarUlong {
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

impl Decode for VarUlong {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let mut val = 0;
        for i in 0..Self::MAX_SIZE {
            let byte = r.read_u8()?;
            val |= u64::from(byte & 0x7f) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(VarUlong(val));
            }
        }
        bail!("varulong is too large")
    }
}

impl From<u64> for VarUlong {
    fn from(n: u64) -> Self {
        VarUlong(n)
    }
}

impl From<VarUlong> for u64 {
    fn from(n: VarUlong) -> Self {
        n.0
    }
}

/// An `i64` encoded as a zigzag varint.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct VarLong(pub i64);

impl Encode for VarLong {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        let zigzag = ((self.0 << 1) ^ (self.0 >> 63)) as u64;
        VarUlong(zigzag).encode(w)
    }
}

impl Decode for VarLong {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let zigzag = VarUlong::decode(r)?.0;
        Ok(VarLong(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64)))
    }
}

impl From<i64> for VarLong {
    fn from(n: i64) -> Self {
        VarLong(n)
    }
}

impl From<VarLong> for i64 {
    fn from(n: VarLong) -> Self {
        n.0
    }
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;

    #[test]
    fn varulong_round_trip() {
        let mut rng = thread_rng();
        let mut buf = vec![];

        for n in (0..100_000).map(|_| rng.gen()).chain([0, u64::MAX]) {
            VarUlong(n).encode(&mut buf).unwrap();

            let mut slice = buf.as_slice();
            assert!(slice.len() <= VarUlong::MAX_SIZE);
            assert_eq!(n, VarUlong::decode(&mut slice).unwrap().0);
            assert!(slice.is_empty());
            buf.clear();
        }
    }

    #[test]
    fn varlong_round_trip() {
        let mut rng = thread_rng();
        let mut buf = vec![];

        for n in (0..100_000)
            .map(|_| rng.gen())
            .chain([0, -1, i64::MIN, i64::MAX])
        {
            VarLong(n).encode(&mut buf).unwrap();

            let mut slice = buf.as_slice();
            assert_eq!(n, VarLong::decode(&mut slice).unwrap().0);
            assert!(slice.is_empty());
            buf.clear();
        }
    }
}
