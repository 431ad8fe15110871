#![no_main]

//! Arbitrary bytes through every registered decoder.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use transcode_codecs::{CodecRegistry, Coder, CoderConfig, Direction, Received};
use transcode_core::{ChannelLayout, MediaType, Packet, PixelFormat, SampleFormat};

#[derive(Arbitrary, Debug)]
struct Input {
    codec: u8,
    width: u8,
    height: u8,
    planar: bool,
    packets: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let registry = CodecRegistry::global();
    let decoders: Vec<_> = registry
        .list()
        .into_iter()
        .filter(|info| info.direction == Direction::Decode)
        .collect();
    if decoders.is_empty() {
        return;
    }
    let info = decoders[usize::from(input.codec) % decoders.len()];
    let config = match info.id.media_type() {
        MediaType::Video => CoderConfig::video(
            u32::from(input.width % 32).max(1),
            u32::from(input.height % 32).max(1),
            PixelFormat::Yuv420p,
        ),
        _ => {
            let format = if input.planar { SampleFormat::S16p } else { SampleFormat::S16 };
            CoderConfig::audio(format, 48_000, ChannelLayout::Stereo)
        }
    };
    let Ok(mut coder) = Coder::by_name(info.name, Direction::Decode) else {
        return;
    };
    if coder.set_config(config).is_err() || coder.open().is_err() {
        return;
    }

    for data in input.packets.iter().take(32) {
        if data.is_empty() {
            continue;
        }
        let Ok(packet) = Packet::copy_from_slice(data) else {
            continue;
        };
        if coder.send_packet(&packet).is_err() {
            return;
        }
        while let Ok(Received::Ready(_)) = coder.receive_output() {}
    }
    let _ = coder.send_eos();
    while let Ok(Received::Ready(_)) = coder.receive_output() {}
});
