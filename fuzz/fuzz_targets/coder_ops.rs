#![no_main]

//! Random call sequences against an opened rawvideo decoder.
//!
//! Beyond "no panics", checks that `Busy` is never followed by `NotReady`
//! and that a drain after end of stream terminates.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use transcode_codecs::{Coder, CoderConfig, Received, SendStatus};
use transcode_core::{CodecId, Packet, PixelFormat};

#[derive(Arbitrary, Debug)]
struct Input {
    capacity: u8,
    reorder_depth: u8,
    threads: u8,
    ops: Vec<Op>,
}

#[derive(Arbitrary, Debug)]
enum Op {
    Send { pts: i16, len: u8 },
    Receive,
    Eos,
    Reset,
    Close,
}

fuzz_target!(|input: Input| {
    let config = CoderConfig::video(4, 2, PixelFormat::Gray8)
        .with_max_buffered_units(usize::from(input.capacity % 8))
        .with_reorder_depth(usize::from(input.reorder_depth % 4))
        .with_threads(usize::from(input.threads % 4).max(1));
    let Ok(mut coder) = Coder::decoder(CodecId::RawVideo) else {
        return;
    };
    if coder.set_config(config).is_err() || coder.open().is_err() {
        return;
    }

    for op in input.ops.iter().take(256) {
        match *op {
            Op::Send { pts, len } => {
                let Ok(packet) = Packet::copy_from_slice(&vec![0x80; usize::from(len % 16)]) else {
                    continue;
                };
                let packet = packet.with_timestamps(Some(i64::from(pts)), None);
                if let Ok(SendStatus::Busy) = coder.send_packet(&packet) {
                    assert!(!matches!(coder.receive_output(), Ok(Received::NotReady)));
                }
            }
            Op::Receive => {
                let _ = coder.receive_output();
            }
            Op::Eos => {
                let _ = coder.send_eos();
            }
            Op::Reset => {
                let _ = coder.reset();
            }
            Op::Close => coder.close(),
        }
    }

    if matches!(coder.send_eos(), Ok(SendStatus::Accepted | SendStatus::StreamEnded)) {
        for _ in 0..=coder.max_buffering_depth() + 64 {
            match coder.receive_output() {
                Ok(Received::Exhausted) => return,
                Ok(Received::NotReady) => panic!("not ready after end of stream"),
                Ok(Received::Ready(_)) | Err(_) => {}
            }
        }
        panic!("drain did not terminate");
    }
});
