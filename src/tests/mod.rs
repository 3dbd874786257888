use realmgate_protocol::{Encode, Packet, PacketDecoder, PacketEncoder, PacketFrame};

mod control;
mod state;

/// Encodes a packet and decodes it back into the frame the relay would
/// hand to the interceptor.
fn frame_of<P: Packet + Encode>(pkt: &P) -> PacketFrame {
    let mut enc = PacketEncoder::new();
    enc.append_packet(pkt).unwrap();

    let mut dec = PacketDecoder::new();
    dec.queue_bytes(enc.take());
    dec.try_next_packet().unwrap().unwrap()
}
