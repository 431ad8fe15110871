//! Configuration snapshots survive a JSON round trip.
#![cfg(feature = "serde")]

use transcode_codecs::{Coder, CoderConfig, CoderFlags, Negotiated, ThreadType};
use transcode_core::{ChannelLayout, CodecId, PixelFormat, Rational, SampleFormat, TimeBase};

#[test]
fn video_config_round_trips() {
    let config = CoderConfig::video(640, 360, PixelFormat::Yuv420p)
        .with_time_base(TimeBase::new(1, 90_000))
        .with_frame_rate(Rational::new(30, 1))
        .with_max_b_frames(2)
        .with_threads(4)
        .with_thread_type(ThreadType::SLICE)
        .with_flags(CoderFlags::LOW_DELAY)
        .with_extradata(vec![1, 2, 3]);
    let json = serde_json::to_string(&config).unwrap();
    let back: CoderConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn audio_config_round_trips() {
    let config = CoderConfig::audio(SampleFormat::S16, 48_000, ChannelLayout::Stereo);
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["sample_rate"], 48_000);
    let back: CoderConfig = serde_json::from_value(value).unwrap();
    assert_eq!(back, config);
}

#[test]
fn negotiated_facts_round_trip() {
    let mut coder = Coder::decoder(CodecId::RawVideo).unwrap();
    coder
        .set_config(CoderConfig::video(8, 8, PixelFormat::Gray8).with_reorder_depth(2))
        .unwrap();
    coder.open().unwrap();
    let negotiated = coder.negotiated().clone();
    let json = serde_json::to_string(&negotiated).unwrap();
    let back: Negotiated = serde_json::from_str(&json).unwrap();
    assert_eq!(back, negotiated);
    assert_eq!(back.reorder_depth, 2);
}
