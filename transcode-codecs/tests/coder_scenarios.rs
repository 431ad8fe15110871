//! End-to-end scenarios for coders driven through send/receive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use transcode_codecs::{
    Capabilities, CodecInfo, Coder, CoderConfig, CoderFlags, CoderState, CodingContext, Decoder,
    Direction, Encoder, Executor, Job, Negotiated, Received, SendStatus, SerialExecutor,
    ThreadType,
};
use transcode_core::{
    AddPolicy, ChannelLayout, CodecError, CodecId, CodecResult, ErrorKind, Frame, FrameFlags,
    FramePool, FrameSideDataType, Packet, PacketFlags, PixelFormat, Result, SampleFormat,
    SideDataValue, TimeBase, FRAME_ALIGN,
};

fn raw_decoder(config: CoderConfig) -> Coder {
    let mut coder = Coder::decoder(CodecId::RawVideo).unwrap();
    coder.set_config(config).unwrap();
    coder.open().unwrap();
    coder
}

fn raw_encoder(config: CoderConfig) -> Coder {
    let mut coder = Coder::encoder(CodecId::RawVideo).unwrap();
    coder.set_config(config).unwrap();
    coder.open().unwrap();
    coder
}

fn gray_packet(width: u32, height: u32, fill: u8, pts: i64) -> Packet<'static> {
    let size = PixelFormat::Gray8.image_size(width, height);
    Packet::copy_from_slice(&vec![fill; size])
        .unwrap()
        .with_timestamps(Some(pts), Some(pts))
        .with_time_base(TimeBase::new(1, 25))
}

/// Send every packet, receiving whenever the decoder pushes back, then drain.
fn decode_all(coder: &mut Coder, packets: &[Packet<'static>]) -> Vec<Frame<'static>> {
    let mut out = Vec::new();
    for packet in packets {
        loop {
            match coder.send_packet(packet).unwrap() {
                SendStatus::Accepted => break,
                SendStatus::Busy => out.push(
                    coder
                        .receive_frame()
                        .unwrap()
                        .ready()
                        .expect("a busy coder has output"),
                ),
                SendStatus::StreamEnded => panic!("stream ended early"),
            }
        }
        while let Received::Ready(frame) = coder.receive_frame().unwrap() {
            out.push(frame);
        }
    }
    assert_eq!(coder.send_eos().unwrap(), SendStatus::Accepted);
    loop {
        match coder.receive_frame().unwrap() {
            Received::Ready(frame) => out.push(frame),
            Received::Exhausted => break,
            Received::NotReady => panic!("not ready while draining"),
        }
    }
    out
}

fn encode_all(coder: &mut Coder, frames: &[Frame<'static>]) -> Vec<Packet<'static>> {
    let mut out = Vec::new();
    for frame in frames {
        while coder.send_frame(frame).unwrap() == SendStatus::Busy {
            out.push(coder.receive_packet().unwrap().ready().expect("a busy coder has output"));
        }
        while let Received::Ready(packet) = coder.receive_packet().unwrap() {
            out.push(packet);
        }
    }
    coder.send_eos().unwrap();
    while let Received::Ready(packet) = coder.receive_packet().unwrap() {
        out.push(packet);
    }
    assert!(matches!(coder.receive_packet().unwrap(), Received::Exhausted));
    out
}

#[test]
fn compressed_to_raw_three_units() {
    let mut coder = raw_decoder(CoderConfig::video(4, 4, PixelFormat::Gray8));
    let packets: Vec<_> = (0..3).map(|i| gray_packet(4, 4, i as u8, i)).collect();
    let frames = decode_all(&mut coder, &packets);
    assert_eq!(frames.len(), 3);
    assert!(frames.windows(2).all(|w| w[0].pts <= w[1].pts));
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.data(0).unwrap()[0], i as u8);
        assert_eq!(frame.time_base, TimeBase::new(1, 25));
    }
    assert!(matches!(coder.receive_frame().unwrap(), Received::Exhausted));
}

#[test]
fn raw_to_compressed_with_one_b_frame() {
    let config = CoderConfig::video(4, 4, PixelFormat::Gray8).with_max_b_frames(1);
    let mut coder = raw_encoder(config);
    assert_eq!(coder.negotiated().delay, 1);
    let frames: Vec<_> = (0..3)
        .map(|pts| {
            let mut frame = Frame::video(4, 4, PixelFormat::Gray8);
            frame.alloc_buffers(FRAME_ALIGN).unwrap();
            frame.pts = Some(pts);
            frame.duration = 1;
            frame
        })
        .collect();
    let packets = encode_all(&mut coder, &frames);
    let order: Vec<_> = packets.iter().map(|p| p.pts.unwrap()).collect();
    assert_eq!(order, vec![0, 2, 1]);
    assert!(packets.iter().all(|p| p.len() == 16));
}

#[test]
fn busy_back_pressure_with_capacity_one() {
    let config = CoderConfig::video(2, 2, PixelFormat::Gray8).with_max_buffered_units(1);
    let mut coder = raw_decoder(config);
    let first = gray_packet(2, 2, 1, 0);
    let second = gray_packet(2, 2, 2, 1);
    assert_eq!(coder.send_packet(&first).unwrap(), SendStatus::Accepted);
    assert_eq!(coder.send_packet(&second).unwrap(), SendStatus::Busy);
    assert_eq!(coder.send_packet(&second).unwrap(), SendStatus::Busy);
    assert!(coder.receive_frame().unwrap().is_ready());
    assert_eq!(coder.send_packet(&second).unwrap(), SendStatus::Accepted);
}

#[test]
fn busy_never_paired_with_not_ready() {
    let config = CoderConfig::video(2, 2, PixelFormat::Gray8)
        .with_max_buffered_units(2)
        .with_reorder_depth(3);
    let mut coder = raw_decoder(config);
    for pts in 0..20 {
        let packet = gray_packet(2, 2, 0, pts);
        if coder.send_packet(&packet).unwrap() == SendStatus::Busy {
            assert!(!matches!(coder.receive_output().unwrap(), Received::NotReady));
        }
    }
}

#[test]
fn pending_error_ahead_of_reordered_input_keeps_progress() {
    let config = CoderConfig::video(2, 2, PixelFormat::Gray8)
        .with_max_buffered_units(1)
        .with_reorder_depth(1);
    let mut coder = raw_decoder(config);
    let truncated = Packet::copy_from_slice(&[0; 3]).unwrap();
    let packets: Vec<_> = (0..3).map(|pts| gray_packet(2, 2, pts as u8, pts)).collect();

    assert_eq!(coder.send_packet(&truncated).unwrap(), SendStatus::Accepted);
    assert_eq!(coder.send_packet(&packets[0]).unwrap(), SendStatus::Busy);
    let err = coder.receive_frame().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlgorithmFault);

    assert_eq!(coder.send_packet(&packets[0]).unwrap(), SendStatus::Accepted);
    assert_eq!(coder.send_packet(&packets[1]).unwrap(), SendStatus::Accepted);
    assert_eq!(coder.send_packet(&packets[2]).unwrap(), SendStatus::Busy);
    let frame = coder.receive_frame().unwrap().ready().unwrap();
    assert_eq!(frame.pts, Some(0));
    assert_eq!(coder.send_packet(&packets[2]).unwrap(), SendStatus::Accepted);

    assert_eq!(coder.send_eos().unwrap(), SendStatus::Accepted);
    let mut rest = Vec::new();
    loop {
        match coder.receive_frame().unwrap() {
            Received::Ready(frame) => rest.push(frame.pts),
            Received::Exhausted => break,
            Received::NotReady => panic!("not ready while draining"),
        }
    }
    assert_eq!(rest, vec![Some(1), Some(2)]);
}

#[test]
fn one_receive_admits_retried_frame_on_reordering_encoder() {
    let config = CoderConfig::video(2, 2, PixelFormat::Gray8)
        .with_max_b_frames(1)
        .with_max_buffered_units(1);
    let mut coder = raw_encoder(config);
    let mut out = Vec::new();
    let mut busy = 0;
    for pts in 0..5 {
        let mut frame = Frame::video(2, 2, PixelFormat::Gray8);
        frame.alloc_buffers(FRAME_ALIGN).unwrap();
        frame.pts = Some(pts);
        frame.duration = 1;
        if coder.send_frame(&frame).unwrap() == SendStatus::Busy {
            busy += 1;
            out.push(coder.receive_packet().unwrap().ready().expect("a busy coder has output"));
            assert_eq!(coder.send_frame(&frame).unwrap(), SendStatus::Accepted);
        }
    }
    assert!(busy > 0);
    coder.send_eos().unwrap();
    while let Received::Ready(packet) = coder.receive_packet().unwrap() {
        out.push(packet);
    }
    let order: Vec<_> = out.iter().map(|p| p.pts.unwrap()).collect();
    assert_eq!(order, vec![0, 2, 1, 4, 3]);
}

#[test]
fn drain_terminates_within_buffering_depth() {
    let config = CoderConfig::video(2, 2, PixelFormat::Gray8)
        .with_max_buffered_units(2)
        .with_reorder_depth(4);
    let mut coder = raw_decoder(config);
    let mut delivered = 0;
    let mut sent = 0;
    for pts in 0..3 {
        if coder.send_packet(&gray_packet(2, 2, 0, pts)).unwrap() == SendStatus::Accepted {
            sent += 1;
        }
    }
    coder.send_eos().unwrap();
    assert_eq!(coder.send_packet(&gray_packet(2, 2, 0, 9)).unwrap(), SendStatus::StreamEnded);
    let bound = coder.max_buffering_depth() + sent;
    loop {
        match coder.receive_output().unwrap() {
            Received::Ready(_) => delivered += 1,
            Received::Exhausted => break,
            Received::NotReady => panic!("not ready while draining"),
        }
        assert!(delivered <= bound);
    }
    assert_eq!(delivered, sent);
}

#[test]
fn reset_on_fresh_coder_changes_nothing() {
    let mut coder = raw_decoder(CoderConfig::video(2, 2, PixelFormat::Gray8));
    let negotiated = coder.negotiated().clone();
    coder.reset().unwrap();
    assert_eq!(coder.state(), CoderState::Opened);
    assert_eq!(coder.negotiated(), &negotiated);
    assert!(matches!(coder.receive_frame().unwrap(), Received::NotReady));
    assert_eq!(coder.send_packet(&gray_packet(2, 2, 0, 0)).unwrap(), SendStatus::Accepted);
}

#[test]
fn reset_after_drain_accepts_new_segment() {
    let config = CoderConfig::video(2, 2, PixelFormat::Gray8).with_reorder_depth(1);
    let mut coder = raw_decoder(config);
    let first = decode_all(&mut coder, &[gray_packet(2, 2, 1, 0)]);
    assert_eq!(first.len(), 1);
    assert_eq!(coder.send_eos().unwrap(), SendStatus::StreamEnded);
    coder.reset().unwrap();
    let second = decode_all(&mut coder, &[gray_packet(2, 2, 2, 100), gray_packet(2, 2, 3, 101)]);
    let pts: Vec<_> = second.iter().map(|f| f.pts).collect();
    assert_eq!(pts, vec![Some(100), Some(101)]);
}

#[test]
fn frame_threads_batch_and_keep_order() {
    let config = CoderConfig::video(8, 6, PixelFormat::Gray8).with_threads(4);
    let mut coder = raw_decoder(config);
    assert_eq!(coder.negotiated().thread_type, ThreadType::FRAME);
    assert_eq!(coder.negotiated().delay, 3);
    let packets: Vec<_> = (0..10).map(|i| gray_packet(8, 6, i as u8 * 3, i)).collect();
    let frames = decode_all(&mut coder, &packets);
    assert_eq!(frames.len(), 10);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.pts, Some(i as i64));
        let row = &frame.data(0).unwrap()[frame.stride(0) * 5..frame.stride(0) * 5 + 8];
        assert!(row.iter().all(|&b| b == i as u8 * 3));
    }
}

#[derive(Default)]
struct CountingExecutor {
    batches: AtomicUsize,
}

impl Executor for CountingExecutor {
    fn concurrency(&self) -> usize {
        2
    }

    fn execute(&self, jobs: usize, job: &Job<'_>) -> Vec<CodecResult<()>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        SerialExecutor.execute(jobs, job)
    }
}

#[test]
fn slice_threads_use_injected_executor() {
    let executor = Arc::new(CountingExecutor::default());
    let config = CoderConfig::video(16, 12, PixelFormat::Yuv420p)
        .with_threads(3)
        .with_thread_type(ThreadType::SLICE);
    let mut decoder = Coder::decoder(CodecId::RawVideo).unwrap();
    decoder.set_config(config.clone()).unwrap();
    decoder.set_executor(executor.clone()).unwrap();
    decoder.open().unwrap();
    assert_eq!(decoder.negotiated().thread_type, ThreadType::SLICE);

    let size = PixelFormat::Yuv420p.image_size(16, 12);
    let bytes: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    let packet = Packet::copy_from_slice(&bytes).unwrap();
    let frames = decode_all(&mut decoder, &[packet]);
    assert!(executor.batches.load(Ordering::SeqCst) >= 3);

    let mut encoder = raw_encoder(config);
    let packets = encode_all(&mut encoder, &frames);
    assert_eq!(packets[0].data(), &bytes[..]);
}

#[test]
fn pooled_allocator_recycles_frames() {
    let pool = Arc::new(FramePool::new(4));
    let mut coder = Coder::decoder(CodecId::RawVideo).unwrap();
    coder.set_config(CoderConfig::video(4, 4, PixelFormat::Gray8)).unwrap();
    coder.set_allocator(pool.clone()).unwrap();
    coder.open().unwrap();
    let packets: Vec<_> = (0..3).map(|i| gray_packet(4, 4, 0, i)).collect();
    let frames = decode_all(&mut coder, &packets);
    assert_eq!(frames.len(), 3);
    drop(frames);
    assert!(pool.available() > 0);
}

#[test]
fn global_side_data_reaches_every_frame() {
    let mut coder = Coder::decoder(CodecId::RawVideo).unwrap();
    coder.set_config(CoderConfig::video(2, 2, PixelFormat::Gray8)).unwrap();
    coder
        .add_global_side_data(
            FrameSideDataType::ContentLightLevel,
            SideDataValue::ContentLightLevel { max_cll: 1000, max_fall: 400 },
            AddPolicy::Replace,
        )
        .unwrap();
    coder.open().unwrap();
    let frames = decode_all(&mut coder, &[gray_packet(2, 2, 0, 0), gray_packet(2, 2, 0, 1)]);
    for frame in &frames {
        let value = frame.side_data().value(FrameSideDataType::ContentLightLevel).unwrap();
        assert_eq!(value, Some(SideDataValue::ContentLightLevel { max_cll: 1000, max_fall: 400 }));
    }
}

#[test]
fn pcm_by_name() {
    let mut coder = Coder::by_name("pcm_s16le", Direction::Decode).unwrap();
    coder
        .set_config(CoderConfig::audio(SampleFormat::S16p, 8000, ChannelLayout::Stereo))
        .unwrap();
    coder.open().unwrap();
    let packet = Packet::copy_from_slice(&[1, 0, 2, 0, 3, 0, 4, 0])
        .unwrap()
        .with_timestamps(Some(0), None)
        .with_time_base(TimeBase::new(1, 8000));
    let frames = decode_all(&mut coder, &[packet]);
    assert_eq!(frames[0].nb_samples, 2);
    assert_eq!(frames[0].plane_count(), 2);
    assert_eq!(frames[0].duration, 2);
}

#[test]
fn unsupported_rate_fails_negotiation() {
    static PICKY: CodecInfo = CodecInfo {
        name: "picky",
        long_name: "decoder with a fixed rate",
        id: CodecId::PcmS16le,
        direction: Direction::Decode,
        capabilities: Capabilities::empty(),
        pixel_formats: &[],
        sample_formats: &[],
        sample_rates: &[48000],
    };
    let picky = Faulty { info: &PICKY, fatal_after: usize::MAX, seen: 0 };
    let mut coder = Coder::from_decoder(Box::new(picky));
    coder
        .set_config(CoderConfig::audio(SampleFormat::S16, 44100, ChannelLayout::Mono))
        .unwrap();
    assert_eq!(coder.open().unwrap_err().kind(), ErrorKind::NegotiationFailed);
    assert_eq!(coder.state(), CoderState::Configured);
    coder.set_option("sample_rate", "48000").unwrap();
    coder.open().unwrap();
}

static FAULTY: CodecInfo = CodecInfo {
    name: "faulty",
    long_name: "decoder that breaks",
    id: CodecId::RawVideo,
    direction: Direction::Decode,
    capabilities: Capabilities::empty(),
    pixel_formats: &[],
    sample_formats: &[],
    sample_rates: &[],
};

/// Emits an empty frame per packet until `fatal_after` packets, then fails.
struct Faulty {
    info: &'static CodecInfo,
    fatal_after: usize,
    seen: usize,
}

impl Decoder for Faulty {
    fn info(&self) -> &'static CodecInfo {
        self.info
    }

    fn open(&mut self, _config: &CoderConfig, _negotiated: &mut Negotiated) -> Result<()> {
        Ok(())
    }

    fn decode(&mut self, packet: Packet<'static>, ctx: &mut CodingContext) -> Result<()> {
        self.seen += 1;
        if self.seen > self.fatal_after {
            return Err(CodecError::Internal("state corrupted".into()).into());
        }
        let mut frame = Frame::new();
        ctx.copy_packet_props(&packet, &mut frame);
        ctx.emit_frame(frame)
    }

    fn flush(&mut self) {
        self.seen = 0;
    }
}

#[test]
fn fatal_fault_reports_once_then_exhausts() {
    let faulty = Faulty { info: &FAULTY, fatal_after: 1, seen: 0 };
    let mut coder = Coder::from_decoder(Box::new(faulty));
    coder.set_config(CoderConfig::video(2, 2, PixelFormat::Gray8)).unwrap();
    coder.open().unwrap();

    let packet = gray_packet(2, 2, 0, 0);
    assert_eq!(coder.send_packet(&packet).unwrap(), SendStatus::Accepted);
    assert!(coder.receive_frame().unwrap().is_ready());
    assert_eq!(coder.send_packet(&packet).unwrap(), SendStatus::Accepted);

    let err = coder.receive_frame().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlgorithmFault);
    assert!(matches!(coder.receive_frame().unwrap(), Received::Exhausted));
    assert_eq!(coder.send_packet(&packet).unwrap_err().kind(), ErrorKind::InvalidState);

    coder.reset().unwrap();
    assert_eq!(coder.send_packet(&packet).unwrap(), SendStatus::Accepted);
    assert!(coder.receive_frame().unwrap().is_ready());
}

static SIEVE: CodecInfo = CodecInfo {
    name: "sieve",
    long_name: "decoder rejecting marked packets",
    id: CodecId::RawVideo,
    direction: Direction::Decode,
    capabilities: Capabilities::FRAME_THREADS,
    pixel_formats: &[],
    sample_formats: &[],
    sample_rates: &[],
};

/// Rejects packets starting with 0xff; emits an empty frame for the rest.
struct Sieve;

impl Decoder for Sieve {
    fn info(&self) -> &'static CodecInfo {
        &SIEVE
    }

    fn open(&mut self, _config: &CoderConfig, _negotiated: &mut Negotiated) -> Result<()> {
        Ok(())
    }

    fn decode(&mut self, packet: Packet<'static>, ctx: &mut CodingContext) -> Result<()> {
        if packet.data().first() == Some(&0xff) {
            return Err(CodecError::InvalidData("marked packet".into()).into());
        }
        let mut frame = Frame::new();
        ctx.copy_packet_props(&packet, &mut frame);
        ctx.emit_frame(frame)
    }

    fn flush(&mut self) {}
}

#[test]
fn batch_keeps_units_after_a_bad_one() {
    let mut coder = Coder::from_decoder(Box::new(Sieve));
    coder
        .set_config(CoderConfig::video(2, 2, PixelFormat::Gray8).with_threads(2))
        .unwrap();
    coder.set_executor(Arc::new(SerialExecutor)).unwrap();
    coder.open().unwrap();
    assert_eq!(coder.negotiated().thread_type, ThreadType::FRAME);

    let bad = gray_packet(2, 2, 0xff, 0);
    let good = gray_packet(2, 2, 1, 1);
    assert_eq!(coder.send_packet(&bad).unwrap(), SendStatus::Accepted);
    assert_eq!(coder.send_packet(&good).unwrap(), SendStatus::Accepted);
    assert_eq!(coder.send_eos().unwrap(), SendStatus::Accepted);

    let mut frames = Vec::new();
    let mut errors = 0;
    loop {
        match coder.receive_frame() {
            Ok(Received::Ready(frame)) => frames.push(frame.pts),
            Ok(Received::Exhausted) => break,
            Ok(Received::NotReady) => panic!("not ready while draining"),
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::AlgorithmFault);
                errors += 1;
            }
        }
    }
    assert_eq!(frames, vec![Some(1)]);
    assert_eq!(errors, 1);
}

#[test]
fn discarded_and_corrupt_frames_filtered() {
    let flagged = |flags, pts| {
        let mut packet = gray_packet(2, 2, 0, pts);
        packet.flags = flags;
        packet
    };
    let packets = [
        flagged(PacketFlags::DISCARD, 0),
        flagged(PacketFlags::CORRUPT, 1),
        flagged(PacketFlags::empty(), 2),
    ];

    let mut coder = raw_decoder(CoderConfig::video(2, 2, PixelFormat::Gray8));
    let frames = decode_all(&mut coder, &packets);
    let pts: Vec<_> = frames.iter().map(|f| f.pts).collect();
    assert_eq!(pts, vec![Some(2)]);

    let config =
        CoderConfig::video(2, 2, PixelFormat::Gray8).with_flags(CoderFlags::OUTPUT_CORRUPT);
    let mut coder = raw_decoder(config);
    let frames = decode_all(&mut coder, &packets);
    let pts: Vec<_> = frames.iter().map(|f| f.pts).collect();
    assert_eq!(pts, vec![Some(1), Some(2)]);
    assert!(frames[0].flags.contains(FrameFlags::CORRUPT));
}

const CHUNK: usize = 4;

/// Fixed frame size encoder; one packet of one byte per sample.
struct Chunker {
    info: &'static CodecInfo,
}

impl Encoder for Chunker {
    fn info(&self) -> &'static CodecInfo {
        self.info
    }

    fn open(&mut self, _config: &CoderConfig, negotiated: &mut Negotiated) -> Result<()> {
        negotiated.frame_size = CHUNK;
        Ok(())
    }

    fn encode(&mut self, frame: Frame<'static>, ctx: &mut CodingContext) -> Result<()> {
        let mut packet = ctx.alloc_packet(frame.nb_samples)?;
        ctx.copy_frame_props(&frame, &mut packet);
        ctx.emit_packet(packet)
    }

    fn flush(&mut self) {}
}

fn chunker(info: &'static CodecInfo) -> Coder {
    let mut coder = Coder::from_encoder(Box::new(Chunker { info }));
    coder
        .set_config(CoderConfig::audio(SampleFormat::S16, 8000, ChannelLayout::Mono))
        .unwrap();
    coder.open().unwrap();
    assert_eq!(coder.negotiated().frame_size, CHUNK);
    coder
}

fn samples(nb_samples: usize) -> Frame<'static> {
    let mut frame = Frame::audio(SampleFormat::S16, ChannelLayout::Mono, 8000, nb_samples);
    frame.alloc_buffers(FRAME_ALIGN).unwrap();
    frame
}

#[test]
fn fixed_frame_size_enforced_on_encoders() {
    static STRICT: CodecInfo = CodecInfo {
        name: "strict",
        long_name: "fixed frame size",
        id: CodecId::PcmS16le,
        direction: Direction::Encode,
        capabilities: Capabilities::empty(),
        pixel_formats: &[],
        sample_formats: &[],
        sample_rates: &[],
    };
    static SHORT_TAIL: CodecInfo = CodecInfo {
        name: "short_tail",
        long_name: "fixed frame size with a short last frame",
        id: CodecId::PcmS16le,
        direction: Direction::Encode,
        capabilities: Capabilities::SMALL_LAST_FRAME,
        pixel_formats: &[],
        sample_formats: &[],
        sample_rates: &[],
    };
    static VARIABLE: CodecInfo = CodecInfo {
        name: "variable",
        long_name: "any frame size",
        id: CodecId::PcmS16le,
        direction: Direction::Encode,
        capabilities: Capabilities::VARIABLE_FRAME_SIZE,
        pixel_formats: &[],
        sample_formats: &[],
        sample_rates: &[],
    };

    let mut coder = chunker(&STRICT);
    assert_eq!(coder.send_frame(&samples(CHUNK)).unwrap(), SendStatus::Accepted);
    let err = coder.send_frame(&samples(CHUNK + 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = coder.send_frame(&samples(CHUNK - 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut coder = chunker(&SHORT_TAIL);
    let packets = encode_all(&mut coder, &[samples(CHUNK), samples(CHUNK - 1)]);
    let sizes: Vec<_> = packets.iter().map(|p| p.len()).collect();
    assert_eq!(sizes, vec![CHUNK, CHUNK - 1]);

    coder.reset().unwrap();
    assert_eq!(coder.send_frame(&samples(CHUNK - 1)).unwrap(), SendStatus::Accepted);
    while coder.receive_packet().unwrap().is_ready() {}
    let err = coder.send_frame(&samples(CHUNK)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut coder = chunker(&VARIABLE);
    let packets = encode_all(&mut coder, &[samples(CHUNK + 3), samples(1), samples(CHUNK)]);
    assert_eq!(packets.len(), 3);
}
