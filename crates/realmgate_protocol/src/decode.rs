use anyhow::{bail, ensure, Context};
use bytes::{Buf, BytesMut};

use crate::var_int::{VarIntDecodeError, VarUint};
use crate::{CompressionThreshold, Decode, Packet, MAX_PACKET_SIZE};

/// Splits a byte stream back into packet frames. The inverse of
/// [`PacketEncoder`](crate::encode::PacketEncoder).
#[derive(Default)]
pub struct PacketDecoder {
    buf: BytesMut,
    decompress_buf: BytesMut,
    threshold: CompressionThreshold,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_compression(&mut self, threshold: CompressionThreshold) {
        self.threshold = threshold;
    }

    pub fn try_next_packet(&mut self) -> anyhow::Result<Option<PacketFrame>> {
        let mut r = &self.buf[..];

        let frame_len = match VarUint::decode_partial(&mut r) {
            Ok(len) => len as usize,
            Err(VarIntDecodeError::Incomplete) => return Ok(None),
            Err(VarIntDecodeError::TooLarge) => bail!("malformed frame length varint"),
        };

        ensure!(
            frame_len <= MAX_PACKET_SIZE,
            "frame length of {frame_len} is out of bounds"
        );

        if r.len() < frame_len {
            // Not enough data arrived yet.
            return Ok(None);
        }

        let frame_len_size = VarUint(frame_len as u32).written_size();

        let mut data;

        if self.threshold.0 >= 0 {
            use std::io::Write;

            use bytes::BufMut;
            use flate2::write::ZlibDecoder;

            r = &r[..frame_len];

            let body_len = VarUint::decode(&mut r)?.0 as usize;

            ensure!(
                body_len <= MAX_PACKET_SIZE,
                "decompressed body length of {body_len} is out of bounds"
            );

            if body_len > 0 {
                debug_assert!(self.decompress_buf.is_empty());
                self.decompress_buf.put_bytes(0, body_len);

                let mut z = ZlibDecoder::new(&mut self.decompress_buf[..]);
                z.write_all(r)?;

                ensure!(
                    z.finish()?.is_empty(),
                    "decompressed body is shorter than expected"
                );

                self.buf.advance(frame_len_size + frame_len);

                data = self.decompress_buf.split();
            } else {
                let remaining = r.len();

                // Skip the length prefix and the stored marker.
                self.buf.advance(frame_len_size + 1);
                data = self.buf.split_to(remaining);
            }
        } else {
            self.buf.advance(frame_len_size);
            data = self.buf.split_to(frame_len);
        }

        // Decode the leading packet id.
        let mut body = &data[..];
        let packet_id = VarUint::decode(&mut body)
            .context("failed to decode packet id")?
            .0;

        data.advance(data.len() - body.len());

        Ok(Some(PacketFrame {
            id: packet_id,
            body: data,
        }))
    }

    pub fn queue_bytes(&mut self, bytes: BytesMut) {
        self.buf.unsplit(bytes);
    }

    pub fn queue_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn take_capacity(&mut self) -> BytesMut {
        self.buf.split_off(self.buf.len())
    }

    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }
}

/// One decoded frame: the packet id and the undecoded body bytes.
#[derive(Clone, Debug)]
pub struct PacketFrame {
    pub id: u32,
    pub body: BytesMut,
}

impl PacketFrame {
    /// Attempts to decode this frame as packet type `P`. Errors if the id
    /// does not match, the body fails to decode, or input is left over.
    pub fn decode<P>(&self) -> anyhow::Result<P>
    where
        P: Packet + Decode,
    {
        ensure!(
            P::ID == self.id,
            "packet id mismatch while decoding '{}': expected {}, got {}",
            P::NAME,
            P::ID,
            self.id
        );

        let mut r = &self.body[..];
        let pkt = P::decode(&mut r)?;

        ensure!(
            r.is_empty(),
            "missed {} bytes while decoding '{}'",
            r.len(),
            P::NAME
        );

        Ok(pkt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::PacketEncoder;
    use crate::packets::{SetTime, Text};
    use crate::types::TextKind;

    #[test]
    fn partial_input_yields_nothing() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&SetTime { time: 9000 }).unwrap();
        let bytes = enc.take();

        let mut dec = PacketDecoder::new();
        dec.queue_slice(&bytes[..bytes.len() - 1]);
        assert!(dec.try_next_packet().unwrap().is_none());

        dec.queue_slice(&bytes[bytes.len() - 1..]);
        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.decode::<SetTime>().unwrap().time, 9000);
    }

    #[test]
    fn decode_rejects_wrong_id() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&SetTime { time: 1 }).unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(enc.take());

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert!(frame.decode::<Text>().is_err());
    }

    #[test]
    fn compressed_text_round_trip() {
        let threshold = CompressionThreshold(16);

        let mut enc = PacketEncoder::with_compression(threshold);
        let mut dec = PacketDecoder::new();
        dec.set_compression(threshold);

        let pkt = Text {
            kind: TextKind::Chat,
            needs_translation: false,
            source: "Steve".to_owned(),
            message: "the quick brown fox jumps over the lazy dog".repeat(8),
            xuid: "2535400000000000".to_owned(),
            platform_chat_id: String::new(),
        };

        enc.append_packet(&pkt).unwrap();
        dec.queue_bytes(enc.take());

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.decode::<Text>().unwrap(), pkt);
    }
}
