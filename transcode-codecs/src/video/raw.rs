//! Uncompressed video.
//!
//! A rawvideo packet holds the planes of one picture back to back with no row
//! padding, in the plane order of the pixel format. Frames carry the same
//! planes with [`FRAME_ALIGN`](transcode_core::FRAME_ALIGN)-aligned strides.
//!
//! The decoder can hold back `reorder_depth` frames to restore presentation
//! order: once more than that many frames are held, the one with the
//! smallest pts (ties broken by arrival) is output. Frames without a pts sort
//! first.
//!
//! The encoder plans a GOP with up to `max_b_frames` B-frames between
//! anchors. Every `gop_size`-th frame is an I-frame. An anchor (I or P) is
//! output first, followed by the B-frames that precede it in display order,
//! so with one B-frame the coding order of display frames `[0, 1, 2]` is
//! `[0, 2, 1]`. B-frames still pending at end of stream become P-frames and
//! are output in display order.

use crate::config::{CoderConfig, CoderFlags, Negotiated};
use crate::context::CodingContext;
use crate::info::{Capabilities, CodecInfo, Direction};
use crate::parallel::{job_error, split_rows, Executor, SerialExecutor};
use crate::traits::{for_each_in_batch, Decoder, Encoder};
use parking_lot::Mutex;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use transcode_core::frame::PlaneGeometry;
use transcode_core::{
    CodecError, CodecId, CodecResult, ColorInfo, Error, Frame, FrameFlags, Packet, PacketFlags,
    PixelFormat, Rational, Result,
};

/// Raw video decoder description.
pub static DECODER_INFO: CodecInfo = CodecInfo {
    name: "rawvideo",
    long_name: "raw video",
    id: CodecId::RawVideo,
    direction: Direction::Decode,
    capabilities: Capabilities::DR1
        .union(Capabilities::DELAY)
        .union(Capabilities::FRAME_THREADS)
        .union(Capabilities::SLICE_THREADS),
    pixel_formats: &[],
    sample_formats: &[],
    sample_rates: &[],
};

/// Raw video encoder description.
pub static ENCODER_INFO: CodecInfo = CodecInfo {
    name: "rawvideo",
    long_name: "raw video",
    id: CodecId::RawVideo,
    direction: Direction::Encode,
    capabilities: Capabilities::DELAY
        .union(Capabilities::FRAME_THREADS)
        .union(Capabilities::SLICE_THREADS),
    pixel_formats: &[],
    sample_formats: &[],
    sample_rates: &[],
};

/// Picture layout fixed at open.
#[derive(Debug, Clone)]
struct Layout {
    format: PixelFormat,
    width: u32,
    height: u32,
    sample_aspect_ratio: Rational,
    color: ColorInfo,
    planes: Vec<PlaneGeometry>,
    image_size: usize,
}

impl Layout {
    fn from_config(config: &CoderConfig) -> Result<Self> {
        let format = config
            .pixel_format
            .ok_or_else(|| Error::negotiation("rawvideo needs a pixel format"))?;
        if config.width == 0 || config.height == 0 {
            return Err(Error::negotiation(format!(
                "invalid dimensions {}x{}",
                config.width, config.height
            )));
        }
        let planes: Vec<_> = (0..format.num_planes())
            .map(|p| PlaneGeometry {
                row_bytes: format.plane_row_bytes(p, config.width),
                rows: format.plane_rows(p, config.height),
            })
            .collect();
        Ok(Self {
            format,
            width: config.width,
            height: config.height,
            sample_aspect_ratio: config.sample_aspect_ratio,
            color: config.color,
            image_size: planes.iter().map(|g| g.row_bytes * g.rows).sum(),
            planes,
        })
    }

    fn describe(&self) -> Frame<'static> {
        let mut frame = Frame::video(self.width, self.height, self.format);
        frame.sample_aspect_ratio = self.sample_aspect_ratio;
        frame.color = self.color;
        frame
    }

    fn check_frame(&self, frame: &Frame<'_>) -> Result<()> {
        if frame.pixel_format() != Some(self.format)
            || frame.width != self.width
            || frame.height != self.height
        {
            return Err(Error::invalid_param(format!(
                "frame {}x{} {:?} does not match encoder {}x{} {}",
                frame.width,
                frame.height,
                frame.pixel_format(),
                self.width,
                self.height,
                self.format
            )));
        }
        Ok(())
    }
}

fn not_open() -> Error {
    CodecError::NotInitialized.into()
}

/// Copy `rows` rows of `row_bytes` between buffers with different strides.
fn copy_rows(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    row_bytes: usize,
    rows: usize,
) -> CodecResult<()> {
    for row in 0..rows {
        let s = row * src_stride;
        let d = row * dst_stride;
        let (Some(from), Some(to)) = (src.get(s..s + row_bytes), dst.get_mut(d..d + row_bytes))
        else {
            return Err(job_error("plane shorter than its geometry"));
        };
        to.copy_from_slice(from);
    }
    Ok(())
}

/// Copy one plane, split into row slices over `executor`.
fn copy_plane(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    geometry: PlaneGeometry,
    executor: &dyn Executor,
    slices: usize,
) -> CodecResult<()> {
    let ranges = split_rows(geometry.rows, slices);
    if ranges.len() <= 1 {
        return copy_rows(src, src_stride, dst, dst_stride, geometry.row_bytes, geometry.rows);
    }
    let mut chunks = Vec::with_capacity(ranges.len());
    let mut rest = dst;
    for range in &ranges {
        let len = (range.len() * dst_stride).min(rest.len());
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
        chunks.push(Mutex::new(head));
        rest = tail;
    }
    executor.execute_all(ranges.len(), &|i| {
        let range = &ranges[i];
        let src = src
            .get(range.start * src_stride..)
            .ok_or_else(|| job_error("plane shorter than its geometry"))?;
        let mut chunk = chunks[i].lock();
        copy_rows(src, src_stride, &mut **chunk, dst_stride, geometry.row_bytes, range.len())
    })
}

/// Spread tightly packed planes into a frame's strided planes.
fn unpack(
    layout: &Layout,
    data: &[u8],
    frame: &mut Frame<'static>,
    executor: &dyn Executor,
    slices: usize,
) -> CodecResult<()> {
    let mut offset = 0;
    for (index, geometry) in layout.planes.iter().enumerate() {
        let size = geometry.row_bytes * geometry.rows;
        let src = data
            .get(offset..offset + size)
            .ok_or_else(|| CodecError::InvalidData("packet shorter than picture".into()))?;
        offset += size;
        let stride = frame.stride(index);
        let dst = frame
            .data_mut(index)
            .ok_or_else(|| job_error(format!("plane {index} is not writable")))?;
        copy_plane(src, geometry.row_bytes, dst, stride, *geometry, executor, slices)?;
    }
    Ok(())
}

/// Gather a frame's strided planes into tightly packed bytes.
fn pack(
    layout: &Layout,
    frame: &Frame<'_>,
    out: &mut [u8],
    executor: &dyn Executor,
    slices: usize,
) -> CodecResult<()> {
    let mut offset = 0;
    for (index, geometry) in layout.planes.iter().enumerate() {
        let size = geometry.row_bytes * geometry.rows;
        let src = frame
            .data(index)
            .ok_or_else(|| CodecError::InvalidData(format!("frame plane {index} is missing")))?;
        let dst = out
            .get_mut(offset..offset + size)
            .ok_or_else(|| job_error("packet shorter than picture"))?;
        offset += size;
        copy_plane(src, frame.stride(index), dst, geometry.row_bytes, *geometry, executor, slices)?;
    }
    Ok(())
}

struct Held {
    key: (i64, u64),
    frame: Frame<'static>,
}

impl PartialEq for Held {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Held {}

impl PartialOrd for Held {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Held {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Raw video decoder.
#[derive(Default)]
pub struct RawVideoDecoder {
    layout: Option<Layout>,
    depth: usize,
    held: BinaryHeap<Reverse<Held>>,
    arrivals: u64,
}

impl RawVideoDecoder {
    /// Create a decoder; the picture layout comes from the configuration.
    pub fn new() -> Self {
        Self::default()
    }

    fn layout(&self) -> Result<&Layout> {
        self.layout.as_ref().ok_or_else(not_open)
    }

    fn describe(&self, packet: &Packet<'static>, ctx: &CodingContext) -> Result<Frame<'static>> {
        let layout = self.layout()?;
        if packet.len() != layout.image_size {
            return Err(CodecError::InvalidData(format!(
                "packet of {} bytes, expected {}",
                packet.len(),
                layout.image_size
            ))
            .into());
        }
        let mut frame = layout.describe();
        ctx.get_buffer(&mut frame)?;
        ctx.copy_packet_props(packet, &mut frame);
        frame.flags.insert(FrameFlags::KEYFRAME);
        Ok(frame)
    }

    fn hold(&mut self, frame: Frame<'static>, ctx: &mut CodingContext) -> Result<()> {
        if self.depth == 0 {
            return ctx.emit_frame(frame);
        }
        let key = (frame.pts.unwrap_or(i64::MIN), self.arrivals);
        self.arrivals += 1;
        self.held.push(Reverse(Held { key, frame }));
        while self.held.len() > self.depth {
            if let Some(Reverse(held)) = self.held.pop() {
                ctx.emit_frame(held.frame)?;
            }
        }
        Ok(())
    }
}

impl Decoder for RawVideoDecoder {
    fn info(&self) -> &'static CodecInfo {
        &DECODER_INFO
    }

    fn open(&mut self, config: &CoderConfig, negotiated: &mut Negotiated) -> Result<()> {
        let layout = Layout::from_config(config)?;
        self.depth = if config.flags.contains(CoderFlags::LOW_DELAY) {
            0
        } else {
            config.reorder_depth
        };
        negotiated.delay = self.depth;
        negotiated.reorder_depth = self.depth;
        negotiated.pixel_format = Some(layout.format);
        self.layout = Some(layout);
        self.flush();
        Ok(())
    }

    fn decode(&mut self, packet: Packet<'static>, ctx: &mut CodingContext) -> Result<()> {
        let mut frame = self.describe(&packet, ctx)?;
        let layout = self.layout()?;
        unpack(layout, packet.data(), &mut frame, ctx.executor(), ctx.slice_threads())?;
        self.hold(frame, ctx)
    }

    fn decode_batch(
        &mut self,
        packets: Vec<Packet<'static>>,
        ctx: &mut CodingContext,
    ) -> Result<()> {
        let image_size = self.layout()?.image_size;
        if packets.len() < 2 || packets.iter().any(|p| p.len() != image_size) {
            return for_each_in_batch(packets, |packet| self.decode(packet, ctx));
        }

        let frames = packets
            .iter()
            .map(|p| self.describe(p, ctx).map(Mutex::new))
            .collect::<Result<Vec<_>>>()?;
        let layout = self.layout()?;
        ctx.executor().execute_all(packets.len(), &|i| {
            let mut frame = frames[i].lock();
            unpack(layout, packets[i].data(), &mut frame, &SerialExecutor, 1)
        })?;
        for frame in frames {
            self.hold(frame.into_inner(), ctx)?;
        }
        Ok(())
    }

    fn drain(&mut self, ctx: &mut CodingContext) -> Result<()> {
        while let Some(Reverse(held)) = self.held.pop() {
            ctx.emit_frame(held.frame)?;
        }
        Ok(())
    }

    fn flush(&mut self) {
        self.held.clear();
        self.arrivals = 0;
    }
}

/// Picture type chosen by the GOP planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    /// Independently coded.
    I,
    /// Predicted from earlier anchors.
    P,
    /// Predicted from both sides; output after the next anchor.
    B,
}

/// Raw video encoder.
#[derive(Default)]
pub struct RawVideoEncoder {
    layout: Option<Layout>,
    gop_size: u64,
    max_b_frames: u64,
    default_duration: i64,
    next_display: u64,
    last_intra: u64,
    pending_b: Vec<Packet<'static>>,
    presentation: VecDeque<Option<i64>>,
    last_duration: i64,
}

impl RawVideoEncoder {
    /// Create an encoder; the picture layout comes from the configuration.
    pub fn new() -> Self {
        Self::default()
    }

    fn layout(&self) -> Result<&Layout> {
        self.layout.as_ref().ok_or_else(not_open)
    }

    /// Type of the picture at display index `display`.
    fn picture_type(&self, display: u64) -> PictureType {
        let intra = if self.gop_size == 0 {
            display == 0
        } else {
            display % self.gop_size == 0
        };
        if intra {
            PictureType::I
        } else if self.max_b_frames == 0 {
            PictureType::P
        } else if (display - self.last_intra) % (self.max_b_frames + 1) == 0 {
            PictureType::P
        } else {
            PictureType::B
        }
    }

    fn emit(&mut self, mut packet: Packet<'static>, ctx: &mut CodingContext) -> Result<()> {
        let shift = self.max_b_frames as i64 * self.last_duration;
        packet.dts = self.presentation.pop_front().flatten().map(|pts| pts - shift);
        ctx.emit_packet(packet)
    }

    fn plan(&mut self, mut packet: Packet<'static>, ctx: &mut CodingContext) -> Result<()> {
        let display_index = self.next_display;
        self.next_display += 1;
        self.presentation.push_back(packet.pts);
        if packet.duration > 0 {
            self.last_duration = packet.duration;
        }
        if packet.duration == 0 {
            packet.duration = self.last_duration;
        }

        let kind = self.picture_type(display_index);
        tracing::trace!(display_index, ?kind, "picture planned");
        match kind {
            PictureType::B => {
                packet.flags.insert(PacketFlags::DISPOSABLE);
                self.pending_b.push(packet);
                Ok(())
            }
            PictureType::I | PictureType::P => {
                if kind == PictureType::I {
                    packet.flags.insert(PacketFlags::KEYFRAME);
                    self.last_intra = display_index;
                }
                self.emit(packet, ctx)?;
                for b in std::mem::take(&mut self.pending_b) {
                    self.emit(b, ctx)?;
                }
                Ok(())
            }
        }
    }

    fn packet_for(&self, frame: &Frame<'_>, ctx: &CodingContext) -> Result<Packet<'static>> {
        let layout = self.layout()?;
        layout.check_frame(frame)?;
        let mut packet = ctx.alloc_packet(layout.image_size)?;
        ctx.copy_frame_props(frame, &mut packet);
        Ok(packet)
    }
}

fn frame_ticks(config: &CoderConfig) -> i64 {
    config
        .frame_rate
        .invert()
        .rescale(1, config.time_base.as_rational())
        .filter(|&t| t > 0)
        .unwrap_or(1)
}

impl Encoder for RawVideoEncoder {
    fn info(&self) -> &'static CodecInfo {
        &ENCODER_INFO
    }

    fn open(&mut self, config: &CoderConfig, negotiated: &mut Negotiated) -> Result<()> {
        let layout = Layout::from_config(config)?;
        if config.max_b_frames > 0 && config.flags.contains(CoderFlags::LOW_DELAY) {
            return Err(Error::negotiation("B-frames need reordering, which low_delay forbids"));
        }
        self.gop_size = u64::from(config.gop_size);
        self.max_b_frames = u64::from(config.max_b_frames);
        self.default_duration = frame_ticks(config);
        negotiated.delay = config.max_b_frames as usize;
        negotiated.pixel_format = Some(layout.format);
        self.layout = Some(layout);
        self.flush();
        Ok(())
    }

    fn encode(&mut self, frame: Frame<'static>, ctx: &mut CodingContext) -> Result<()> {
        let mut packet = self.packet_for(&frame, ctx)?;
        let layout = self.layout()?;
        let out = packet
            .data_mut()
            .ok_or_else(|| Error::from(job_error("output packet is not writable")))?;
        pack(layout, &frame, out, ctx.executor(), ctx.slice_threads())?;
        self.plan(packet, ctx)
    }

    fn encode_batch(&mut self, frames: Vec<Frame<'static>>, ctx: &mut CodingContext) -> Result<()> {
        let layout = self.layout()?;
        if frames.len() < 2 || frames.iter().any(|f| layout.check_frame(f).is_err()) {
            return for_each_in_batch(frames, |frame| self.encode(frame, ctx));
        }

        let packets = frames
            .iter()
            .map(|f| self.packet_for(f, ctx).map(Mutex::new))
            .collect::<Result<Vec<_>>>()?;
        let layout = self.layout()?;
        ctx.executor().execute_all(frames.len(), &|i| {
            let mut packet = packets[i].lock();
            let out = packet
                .data_mut()
                .ok_or_else(|| job_error("output packet is not writable"))?;
            pack(layout, &frames[i], out, &SerialExecutor, 1)
        })?;
        for packet in packets {
            self.plan(packet.into_inner(), ctx)?;
        }
        Ok(())
    }

    fn drain(&mut self, ctx: &mut CodingContext) -> Result<()> {
        for mut packet in std::mem::take(&mut self.pending_b) {
            packet.flags.remove(PacketFlags::DISPOSABLE);
            self.emit(packet, ctx)?;
        }
        Ok(())
    }

    fn flush(&mut self) {
        self.next_display = 0;
        self.last_intra = 0;
        self.pending_b.clear();
        self.presentation.clear();
        self.last_duration = self.default_duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::traits::MediaUnit;
    use transcode_core::{TimeBase, FRAME_ALIGN};

    fn gray_config() -> CoderConfig {
        CoderConfig::video(5, 3, PixelFormat::Gray8)
    }

    fn opened_decoder(config: &CoderConfig) -> RawVideoDecoder {
        let mut decoder = RawVideoDecoder::new();
        decoder.open(config, &mut Negotiated::default()).unwrap();
        decoder
    }

    fn frames(ctx: &mut CodingContext) -> Vec<Frame<'static>> {
        std::iter::from_fn(|| ctx.pop_output().and_then(MediaUnit::into_frame)).collect()
    }

    fn packets(ctx: &mut CodingContext) -> Vec<Packet<'static>> {
        std::iter::from_fn(|| ctx.pop_output().and_then(MediaUnit::into_packet)).collect()
    }

    #[test]
    fn test_decode_strides_rows() {
        let config = gray_config();
        let mut decoder = opened_decoder(&config);
        let mut ctx = test_context(Direction::Decode, config);
        let data: Vec<u8> = (0..15).collect();
        decoder.decode(Packet::copy_from_slice(&data).unwrap(), &mut ctx).unwrap();
        let frame = frames(&mut ctx).remove(0);
        assert_eq!(frame.stride(0), 32);
        assert_eq!(&frame.data(0).unwrap()[32..37], &[5, 6, 7, 8, 9]);
        assert!(frame.is_keyframe());
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let config = gray_config();
        let mut decoder = opened_decoder(&config);
        let mut ctx = test_context(Direction::Decode, config);
        let err = decoder
            .decode(Packet::copy_from_slice(&[0; 14]).unwrap(), &mut ctx)
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_decode_before_open() {
        let mut decoder = RawVideoDecoder::new();
        let mut ctx = test_context(Direction::Decode, gray_config());
        let err = decoder.decode(Packet::copy_from_slice(&[0; 15]).unwrap(), &mut ctx).unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_reorder_by_pts() {
        let config = gray_config().with_reorder_depth(2);
        let mut decoder = opened_decoder(&config);
        let mut ctx = test_context(Direction::Decode, config);
        for pts in [0, 3, 1, 2, 5, 4] {
            let packet = Packet::copy_from_slice(&[0; 15])
                .unwrap()
                .with_timestamps(Some(pts), None);
            decoder.decode(packet, &mut ctx).unwrap();
        }
        decoder.drain(&mut ctx).unwrap();
        let order: Vec<_> = frames(&mut ctx).iter().map(|f| f.pts).collect();
        assert_eq!(order, [0, 1, 2, 3, 4, 5].map(Some));
    }

    #[test]
    fn test_yuv_round_trip_with_slices() {
        let config = CoderConfig::video(6, 4, PixelFormat::Yuv420p);
        let decoder = opened_decoder(&config);
        let executor = crate::parallel::RayonExecutor::new(2).unwrap();

        let data: Vec<u8> = (0..36).collect();
        let layout = Layout::from_config(&config).unwrap();
        let mut ctx = test_context(Direction::Decode, config);
        let mut frame = decoder.describe(&Packet::copy_from_slice(&data).unwrap(), &ctx).unwrap();
        unpack(&layout, &data, &mut frame, &executor, 3).unwrap();
        assert_eq!(&frame.data(1).unwrap()[..3], &[24, 25, 26]);

        let mut out = vec![0; 36];
        pack(&layout, &frame, &mut out, &executor, 3).unwrap();
        assert_eq!(out, data);
        assert!(frames(&mut ctx).is_empty());
    }

    fn encode_all(config: CoderConfig, count: i64) -> Vec<Packet<'static>> {
        let mut encoder = RawVideoEncoder::new();
        encoder.open(&config, &mut Negotiated::default()).unwrap();
        let mut ctx = test_context(Direction::Encode, config.clone());
        for pts in 0..count {
            let mut frame = Frame::video(config.width, config.height, PixelFormat::Gray8);
            frame.alloc_buffers(FRAME_ALIGN).unwrap();
            frame.pts = Some(pts);
            frame.duration = 1;
            encoder.encode(frame, &mut ctx).unwrap();
        }
        encoder.drain(&mut ctx).unwrap();
        packets(&mut ctx)
    }

    #[test]
    fn test_gop_with_one_b_frame() {
        let out = encode_all(gray_config().with_max_b_frames(1), 3);
        let pts: Vec<_> = out.iter().map(|p| p.pts.unwrap()).collect();
        assert_eq!(pts, [0, 2, 1]);
        let dts: Vec<_> = out.iter().map(|p| p.dts.unwrap()).collect();
        assert_eq!(dts, [-1, 0, 1]);
        assert!(out[0].is_keyframe());
        assert!(out[2].flags.contains(PacketFlags::DISPOSABLE));
        assert!(out.iter().all(|p| p.dts <= p.pts));
    }

    #[test]
    fn test_trailing_b_frames_promoted() {
        let out = encode_all(gray_config().with_max_b_frames(2), 6);
        let pts: Vec<_> = out.iter().map(|p| p.pts.unwrap()).collect();
        assert_eq!(pts, [0, 3, 1, 2, 4, 5]);
        assert!(!out[4].flags.contains(PacketFlags::DISPOSABLE));
        assert!(!out[5].flags.contains(PacketFlags::DISPOSABLE));
        assert!(out.windows(2).all(|w| w[0].dts < w[1].dts));
    }

    #[test]
    fn test_gop_size_keyframes() {
        let out = encode_all(gray_config().with_gop_size(3), 7);
        let keys: Vec<_> = out.iter().filter(|p| p.is_keyframe()).map(|p| p.pts.unwrap()).collect();
        assert_eq!(keys, [0, 3, 6]);
    }

    #[test]
    fn test_encoder_rejects_mismatched_frame() {
        let config = gray_config();
        let mut encoder = RawVideoEncoder::new();
        encoder.open(&config, &mut Negotiated::default()).unwrap();
        let mut ctx = test_context(Direction::Encode, config);
        let mut frame = Frame::video(4, 3, PixelFormat::Gray8);
        frame.alloc_buffers(FRAME_ALIGN).unwrap();
        assert!(encoder.encode(frame, &mut ctx).is_err());
    }

    #[test]
    fn test_low_delay_forbids_b_frames() {
        let config = gray_config().with_max_b_frames(1).with_flags(CoderFlags::LOW_DELAY);
        assert!(RawVideoEncoder::new().open(&config, &mut Negotiated::default()).is_err());
    }

    #[test]
    fn test_frame_ticks() {
        let config = gray_config()
            .with_frame_rate(Rational::new(25, 1))
            .with_time_base(TimeBase::MPEG);
        assert_eq!(frame_ticks(&config), 3600);
        assert_eq!(frame_ticks(&gray_config()), 1);
    }
}
