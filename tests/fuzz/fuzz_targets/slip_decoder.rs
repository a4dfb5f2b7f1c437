#![no_main]

use gateway_proto::frame::{Frame, MAX_FRAME_LEN};
use gateway_proto::slip::Decoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feeds arbitrary byte slices into the SLIP decoder and, for every frame
    // it yields, into the frame validator. Both must reject malformed input
    // cleanly; neither may panic regardless of how hostile the input is.
    let mut decoder: Decoder<MAX_FRAME_LEN> = Decoder::new();
    decoder.feed_all(data, |frame| {
        let _ = Frame::parse(frame);
    });
});
