//! Demonstrates building a frame, SLIP-encoding it, feeding the encoded bytes
//! through the streaming decoder one byte at a time, and validating the
//! frame that comes back out.

use gateway_proto::frame::{build_frame, Frame, MAX_FRAME_LEN};
use gateway_proto::header::{Flags, MessageKind};
use gateway_proto::slip;

fn main() {
    let payload = b"hello from the gateway example";
    let mut frame_buf = [0u8; MAX_FRAME_LEN];
    let frame_len = build_frame(
        MessageKind::Hello,
        255,
        1,
        7,
        Flags::default(),
        payload,
        &mut frame_buf,
    )
    .expect("payload fits in one frame");

    let mut encoded = vec![0u8; slip::encoded_len_upper_bound(frame_len)];
    let encoded_len = slip::encode(&frame_buf[..frame_len], &mut encoded).unwrap();
    println!("built a {frame_len}-byte frame, {encoded_len} bytes once SLIP-encoded");

    let mut decoder: slip::Decoder<MAX_FRAME_LEN> = slip::Decoder::new();
    let mut decoded_frame = None;
    decoder.feed_all(&encoded[..encoded_len], |bytes| decoded_frame = Some(bytes.to_vec()));

    let decoded_bytes = decoded_frame.expect("decoder yields exactly one frame");
    let frame = Frame::parse(&decoded_bytes).expect("round-tripped frame is valid");
    println!(
        "decoded frame: src={} dst={} seq={} payload={:?}",
        frame.header.src,
        frame.header.dst,
        frame.header.seq,
        std::str::from_utf8(frame.payload).unwrap()
    );
}
