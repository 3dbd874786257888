use std::io::Write;

use anyhow::ensure;
use bytes::{BufMut, BytesMut};

use crate::decode::PacketFrame;
use crate::var_int::VarUint;
use crate::{CompressionThreshold, Encode, Packet, MAX_PACKET_SIZE};

/// Frames packets for the wire.
///
/// Each frame is a varuint length prefix followed by the frame data. With
/// compression enabled the frame data starts with a varuint giving the
/// uncompressed body length (zero when the body is stored as-is), followed
/// by the possibly-deflated body. The body itself is a varuint packet id
/// and the packet payload.
#[derive(Default)]
pub struct PacketEncoder {
    buf: BytesMut,
    compress_buf: Vec<u8>,
    threshold: CompressionThreshold,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(threshold: CompressionThreshold) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn set_compression(&mut self, threshold: CompressionThreshold) {
        self.threshold = threshold;
    }

    pub fn append_packet<P>(&mut self, pkt: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode,
    {
        let start_len = self.buf.len();
        pkt.encode_with_id((&mut self.buf).writer())?;
        self.enframe_from(start_len)
    }

    /// Re-frames an already-decoded frame without touching its body. This
    /// is what the relay uses to forward packets unmodified.
    pub fn append_frame(&mut self, frame: &PacketFrame) -> anyhow::Result<()> {
        let start_len = self.buf.len();
        VarUint(frame.id).encode((&mut self.buf).writer())?;
        self.buf.extend_from_slice(&frame.body);
        self.enframe_from(start_len)
    }

    /// Takes all frames written so far.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }

    /// Wraps the bytes from `from` to the end of the buffer into a frame,
    /// compressing them if they clear the threshold.
    fn enframe_from(&mut self, from: usize) -> anyhow::Result<()> {
        let body_len = self.buf.len() - from;

        ensure!(
            body_len <= MAX_PACKET_SIZE,
            "packet exceeds maximum length"
        );

        if self.threshold.0 >= 0 && body_len > self.threshold.0 as usize {
            use std::io::Read;

            use flate2::bufread::ZlibEncoder;
            use flate2::Compression;

            let mut z = ZlibEncoder::new(&self.buf[from..], Compression::new(4));

            self.compress_buf.clear();

            let body_len_size = VarUint(body_len as u32).written_size();
            let frame_len = body_len_size + z.read_to_end(&mut self.compress_buf)?;

            ensure!(
                frame_len <= MAX_PACKET_SIZE,
                "packet exceeds maximum length"
            );

            drop(z);

            self.buf.truncate(from);

            let mut writer = (&mut self.buf).writer();
            VarUint(frame_len as u32).encode(&mut writer)?;
            VarUint(body_len as u32).encode(&mut writer)?;
            self.buf.extend_from_slice(&self.compress_buf);

            return Ok(());
        }

        // Stored frame. With compression enabled a leading zero marks the
        // body as uncompressed.
        let stored_marker_len = usize::from(self.threshold.0 >= 0);
        let frame_len = stored_marker_len + body_len;
        let frame_len_size = VarUint(frame_len as u32).written_size();
        let prefix_len = frame_len_size + stored_marker_len;

        self.buf.put_bytes(0, prefix_len);
        self.buf.copy_within(from..from + body_len, from + prefix_len);

        let mut front = &mut self.buf[from..];
        VarUint(frame_len as u32).encode(&mut front)?;
        if stored_marker_len == 1 {
            VarUint(0).encode(front)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::PacketDecoder;
    use crate::packets::SetTime;

    #[test]
    fn frames_survive_compression_boundary() {
        for threshold in [CompressionThreshold::DISABLED, CompressionThreshold(0)] {
            let mut enc = PacketEncoder::with_compression(threshold);
            let mut dec = PacketDecoder::new();
            dec.set_compression(threshold);

            enc.append_packet(&SetTime { time: 1234 }).unwrap();
            enc.append_packet(&SetTime { time: -1 }).unwrap();

            dec.queue_bytes(enc.take());

            let frame = dec.try_next_packet().unwrap().unwrap();
            assert_eq!(frame.decode::<SetTime>().unwrap().time, 1234);

            let frame = dec.try_next_packet().unwrap().unwrap();
            assert_eq!(frame.decode::<SetTime>().unwrap().time, -1);

            assert!(dec.try_next_packet().unwrap().is_none());
        }
    }

    #[test]
    fn forwarded_frame_is_identical() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&SetTime { time: 77 }).unwrap();
        let original = enc.take();

        let mut dec = PacketDecoder::new();
        dec.queue_slice(&original);
        let frame = dec.try_next_packet().unwrap().unwrap();

        let mut relay = PacketEncoder::new();
        relay.append_frame(&frame).unwrap();
        assert_eq!(relay.take(), original);
    }
}
