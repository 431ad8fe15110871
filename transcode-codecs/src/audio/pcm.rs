//! PCM audio.
//!
//! Packets carry interleaved samples in the wire byte order of the codec.
//! Frames carry native-endian samples, packed or planar as configured.

use crate::config::{CoderConfig, Negotiated};
use crate::context::CodingContext;
use crate::info::{Capabilities, CodecInfo, Direction};
use crate::traits::{Decoder, Encoder};
use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use transcode_core::{
    ChannelLayout, CodecError, CodecId, Error, Frame, FrameFlags, Packet, PacketFlags, Result,
    SampleFormat, TimeBase,
};

/// Sample encoding of a PCM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcmWire {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit little-endian.
    S16Le,
    /// Signed 16-bit big-endian.
    S16Be,
    /// 32-bit float little-endian.
    F32Le,
}

const S16_FORMATS: &[SampleFormat] = &[SampleFormat::S16, SampleFormat::S16p];
const F32_FORMATS: &[SampleFormat] = &[SampleFormat::F32, SampleFormat::F32p];
const U8_FORMATS: &[SampleFormat] = &[SampleFormat::U8, SampleFormat::U8p];

const fn pcm_info(
    name: &'static str,
    long_name: &'static str,
    id: CodecId,
    direction: Direction,
    sample_formats: &'static [SampleFormat],
) -> CodecInfo {
    CodecInfo {
        name,
        long_name,
        id,
        direction,
        capabilities: match direction {
            Direction::Decode => Capabilities::DR1,
            Direction::Encode => Capabilities::VARIABLE_FRAME_SIZE,
        },
        pixel_formats: &[],
        sample_formats,
        sample_rates: &[],
    }
}

static S16LE_DECODER: CodecInfo = pcm_info(
    "pcm_s16le",
    "PCM signed 16-bit little-endian",
    CodecId::PcmS16le,
    Direction::Decode,
    S16_FORMATS,
);
static S16LE_ENCODER: CodecInfo = pcm_info(
    "pcm_s16le",
    "PCM signed 16-bit little-endian",
    CodecId::PcmS16le,
    Direction::Encode,
    S16_FORMATS,
);
static S16BE_DECODER: CodecInfo = pcm_info(
    "pcm_s16be",
    "PCM signed 16-bit big-endian",
    CodecId::PcmS16be,
    Direction::Decode,
    S16_FORMATS,
);
static S16BE_ENCODER: CodecInfo = pcm_info(
    "pcm_s16be",
    "PCM signed 16-bit big-endian",
    CodecId::PcmS16be,
    Direction::Encode,
    S16_FORMATS,
);
static F32LE_DECODER: CodecInfo = pcm_info(
    "pcm_f32le",
    "PCM 32-bit floating point little-endian",
    CodecId::PcmF32le,
    Direction::Decode,
    F32_FORMATS,
);
static F32LE_ENCODER: CodecInfo = pcm_info(
    "pcm_f32le",
    "PCM 32-bit floating point little-endian",
    CodecId::PcmF32le,
    Direction::Encode,
    F32_FORMATS,
);
static U8_DECODER: CodecInfo =
    pcm_info("pcm_u8", "PCM unsigned 8-bit", CodecId::PcmU8, Direction::Decode, U8_FORMATS);
static U8_ENCODER: CodecInfo =
    pcm_info("pcm_u8", "PCM unsigned 8-bit", CodecId::PcmU8, Direction::Encode, U8_FORMATS);

impl PcmWire {
    /// Every supported wire encoding.
    pub const ALL: &'static [PcmWire] =
        &[PcmWire::S16Le, PcmWire::S16Be, PcmWire::F32Le, PcmWire::U8];

    /// Wire encoding of a PCM codec identity.
    pub fn from_codec_id(id: CodecId) -> Option<Self> {
        match id {
            CodecId::PcmU8 => Some(Self::U8),
            CodecId::PcmS16le => Some(Self::S16Le),
            CodecId::PcmS16be => Some(Self::S16Be),
            CodecId::PcmF32le => Some(Self::F32Le),
            _ => None,
        }
    }

    /// Bytes per sample.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16Le | Self::S16Be => 2,
            Self::F32Le => 4,
        }
    }

    /// Packed native sample format matching this encoding.
    pub fn native_format(&self) -> SampleFormat {
        match self {
            Self::U8 => SampleFormat::U8,
            Self::S16Le | Self::S16Be => SampleFormat::S16,
            Self::F32Le => SampleFormat::F32,
        }
    }

    /// Decoder description.
    pub fn decoder_info(&self) -> &'static CodecInfo {
        match self {
            Self::U8 => &U8_DECODER,
            Self::S16Le => &S16LE_DECODER,
            Self::S16Be => &S16BE_DECODER,
            Self::F32Le => &F32LE_DECODER,
        }
    }

    /// Encoder description.
    pub fn encoder_info(&self) -> &'static CodecInfo {
        match self {
            Self::U8 => &U8_ENCODER,
            Self::S16Le => &S16LE_ENCODER,
            Self::S16Be => &S16BE_ENCODER,
            Self::F32Le => &F32LE_ENCODER,
        }
    }

    /// Convert one sample from wire to native order.
    fn to_native(&self, src: &[u8], dst: &mut [u8]) {
        match self {
            Self::U8 => dst[0] = src[0],
            Self::S16Le => NativeEndian::write_i16(dst, LittleEndian::read_i16(src)),
            Self::S16Be => NativeEndian::write_i16(dst, BigEndian::read_i16(src)),
            Self::F32Le => NativeEndian::write_f32(dst, LittleEndian::read_f32(src)),
        }
    }

    /// Convert one sample from native to wire order.
    fn to_wire(&self, src: &[u8], dst: &mut [u8]) {
        match self {
            Self::U8 => dst[0] = src[0],
            Self::S16Le => LittleEndian::write_i16(dst, NativeEndian::read_i16(src)),
            Self::S16Be => BigEndian::write_i16(dst, NativeEndian::read_i16(src)),
            Self::F32Le => LittleEndian::write_f32(dst, NativeEndian::read_f32(src)),
        }
    }
}

/// Stream parameters fixed at open.
#[derive(Debug, Clone, Copy)]
struct Stream {
    format: SampleFormat,
    layout: ChannelLayout,
    channels: usize,
    sample_rate: u32,
}

impl Stream {
    fn negotiate(wire: PcmWire, info: &CodecInfo, config: &CoderConfig) -> Result<Self> {
        let format = config.sample_format.unwrap_or_else(|| wire.native_format());
        if !info.supports_sample_format(format) {
            return Err(Error::negotiation(format!(
                "{} cannot carry sample format {format}",
                info.name
            )));
        }
        let layout = config
            .channel_layout
            .ok_or_else(|| Error::negotiation("channel layout is not set"))?;
        let channels = layout.channels() as usize;
        if channels == 0 || config.sample_rate == 0 {
            return Err(Error::negotiation("PCM needs channels and a sample rate"));
        }
        Ok(Self {
            format,
            layout,
            channels,
            sample_rate: config.sample_rate,
        })
    }

    /// Duration of `samples` in `time_base`, 0 if it cannot be expressed.
    fn duration(&self, samples: usize, time_base: TimeBase) -> i64 {
        TimeBase::new(1, i64::from(self.sample_rate))
            .rescale(samples as i64, time_base)
            .unwrap_or(0)
    }
}

fn not_open() -> Error {
    CodecError::NotInitialized.into()
}

/// PCM decoder.
#[derive(Debug)]
pub struct PcmDecoder {
    wire: PcmWire,
    stream: Option<Stream>,
}

impl PcmDecoder {
    /// Create a decoder for `wire`.
    pub fn new(wire: PcmWire) -> Self {
        Self { wire, stream: None }
    }
}

impl Decoder for PcmDecoder {
    fn info(&self) -> &'static CodecInfo {
        self.wire.decoder_info()
    }

    fn open(&mut self, config: &CoderConfig, negotiated: &mut Negotiated) -> Result<()> {
        let stream = Stream::negotiate(self.wire, self.info(), config)?;
        negotiated.sample_format = Some(stream.format);
        self.stream = Some(stream);
        Ok(())
    }

    fn decode(&mut self, packet: Packet<'static>, ctx: &mut CodingContext) -> Result<()> {
        let stream = self.stream.ok_or_else(not_open)?;
        let bps = self.wire.bytes_per_sample();
        let block = bps * stream.channels;
        let data = packet.data();
        if data.len() % block != 0 {
            return Err(CodecError::InvalidData(format!(
                "{} bytes is not a whole number of {block}-byte sample blocks",
                data.len()
            ))
            .into());
        }
        let nb_samples = data.len() / block;

        let mut frame = Frame::audio(stream.format, stream.layout, stream.sample_rate, nb_samples);
        ctx.get_buffer(&mut frame)?;
        ctx.copy_packet_props(&packet, &mut frame);
        frame.flags.insert(FrameFlags::KEYFRAME);
        if frame.duration == 0 {
            frame.duration = stream.duration(nb_samples, frame.time_base);
        }

        let not_writable =
            || Error::from(CodecError::Internal("frame buffer is not writable".into()));
        if stream.format.is_planar() {
            for ch in 0..stream.channels {
                let plane = frame.data_mut(ch).ok_or_else(not_writable)?;
                let samples = data.chunks_exact(bps).skip(ch).step_by(stream.channels);
                for (i, sample) in samples.enumerate() {
                    self.wire.to_native(sample, &mut plane[i * bps..(i + 1) * bps]);
                }
            }
        } else {
            let plane = frame.data_mut(0).ok_or_else(not_writable)?;
            for (src, dst) in data.chunks_exact(bps).zip(plane.chunks_exact_mut(bps)) {
                self.wire.to_native(src, dst);
            }
        }
        ctx.emit_frame(frame)
    }

    fn flush(&mut self) {}
}

/// PCM encoder.
#[derive(Debug)]
pub struct PcmEncoder {
    wire: PcmWire,
    stream: Option<Stream>,
}

impl PcmEncoder {
    /// Create an encoder for `wire`.
    pub fn new(wire: PcmWire) -> Self {
        Self { wire, stream: None }
    }
}

impl Encoder for PcmEncoder {
    fn info(&self) -> &'static CodecInfo {
        self.wire.encoder_info()
    }

    fn open(&mut self, config: &CoderConfig, negotiated: &mut Negotiated) -> Result<()> {
        let stream = Stream::negotiate(self.wire, self.info(), config)?;
        negotiated.sample_format = Some(stream.format);
        negotiated.frame_size = 0;
        self.stream = Some(stream);
        Ok(())
    }

    fn encode(&mut self, frame: Frame<'static>, ctx: &mut CodingContext) -> Result<()> {
        let stream = self.stream.ok_or_else(not_open)?;
        if frame.sample_format() != Some(stream.format) || frame.channels() != stream.channels {
            return Err(Error::invalid_param(format!(
                "frame {:?} with {} channels does not match encoder {} with {}",
                frame.sample_format(),
                frame.channels(),
                stream.format,
                stream.channels
            )));
        }
        let bps = self.wire.bytes_per_sample();
        let samples = frame.nb_samples * stream.channels;
        let mut packet = ctx.alloc_packet(samples * bps)?;
        let out = packet
            .data_mut()
            .ok_or_else(|| Error::from(CodecError::Internal("packet is not writable".into())))?;
        let missing = |ch: usize| Error::invalid_param(format!("frame plane {ch} is missing"));

        if stream.format.is_planar() {
            for ch in 0..stream.channels {
                let plane = frame.data(ch).ok_or_else(|| missing(ch))?;
                let dst = out.chunks_exact_mut(bps).skip(ch).step_by(stream.channels);
                for (src, dst) in plane.chunks_exact(bps).take(frame.nb_samples).zip(dst) {
                    self.wire.to_wire(src, dst);
                }
            }
        } else {
            let plane = frame.data(0).ok_or_else(|| missing(0))?;
            for (src, dst) in plane.chunks_exact(bps).take(samples).zip(out.chunks_exact_mut(bps)) {
                self.wire.to_wire(src, dst);
            }
        }

        ctx.copy_frame_props(&frame, &mut packet);
        packet.flags.insert(PacketFlags::KEYFRAME);
        packet.dts = packet.pts;
        if packet.duration == 0 {
            packet.duration = stream.duration(frame.nb_samples, packet.time_base);
        }
        ctx.emit_packet(packet)
    }

    fn flush(&mut self) {}
}
