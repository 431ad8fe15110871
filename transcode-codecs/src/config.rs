//! Coder configuration.
//!
//! [`CoderConfig`] is what the caller asks for; [`Negotiated`] is what the
//! coder settled on at open time.

use bitflags::bitflags;
use transcode_core::{
    ChannelLayout, ColorInfo, Error, MediaType, PixelFormat, Rational, Result, SampleFormat,
    TimeBase,
};

/// Default input/output queue capacity of a coder.
pub const DEFAULT_MAX_BUFFERED_UNITS: usize = 4;

bitflags! {
    /// Threading strategies a coder may use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ThreadType: u32 {
        /// Process several inputs concurrently (adds delay).
        const FRAME = 0x0001;
        /// Split one input into concurrently processed slices.
        const SLICE = 0x0002;
    }
}

bitflags! {
    /// Behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CoderFlags: u32 {
        /// Forbid any delay that is not inherent to the bitstream.
        const LOW_DELAY = 0x0001;
        /// Only use bit-exact processing.
        const BITEXACT = 0x0002;
        /// Place global headers in extradata instead of every keyframe.
        const GLOBAL_HEADER = 0x0004;
        /// Output frames even when they are known to be corrupt.
        const OUTPUT_CORRUPT = 0x0008;
    }
}

/// Caller-side coder configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoderConfig {
    /// Pixel format of raw pictures.
    pub pixel_format: Option<PixelFormat>,
    /// Picture width.
    pub width: u32,
    /// Picture height.
    pub height: u32,
    /// Sample aspect ratio.
    pub sample_aspect_ratio: Rational,
    /// Color description.
    pub color: ColorInfo,
    /// Sample format of raw audio.
    pub sample_format: Option<SampleFormat>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Audio channel layout.
    pub channel_layout: Option<ChannelLayout>,
    /// Unit of timestamps.
    pub time_base: TimeBase,
    /// Nominal frame rate.
    pub frame_rate: Rational,
    /// Target bit rate in bits per second.
    pub bit_rate: u64,
    /// Distance between keyframes (0 = only the first).
    pub gop_size: u32,
    /// Maximum consecutive B-frames.
    pub max_b_frames: u32,
    /// Decoder reordering window.
    pub reorder_depth: usize,
    /// Worker threads (0 = one per available core).
    pub thread_count: usize,
    /// Allowed threading strategies.
    pub thread_type: ThreadType,
    /// Behavior flags.
    pub flags: CoderFlags,
    /// Capacity of the coder's unit queues, at least 1.
    pub max_buffered_units: usize,
    /// Out-of-band codec setup data.
    pub extradata: Vec<u8>,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            pixel_format: None,
            width: 0,
            height: 0,
            sample_aspect_ratio: Rational::unknown(),
            color: ColorInfo::default(),
            sample_format: None,
            sample_rate: 0,
            channel_layout: None,
            time_base: TimeBase::UNKNOWN,
            frame_rate: Rational::unknown(),
            bit_rate: 0,
            gop_size: 12,
            max_b_frames: 0,
            reorder_depth: 0,
            thread_count: 1,
            thread_type: ThreadType::FRAME | ThreadType::SLICE,
            flags: CoderFlags::empty(),
            max_buffered_units: DEFAULT_MAX_BUFFERED_UNITS,
            extradata: Vec::new(),
        }
    }
}

impl CoderConfig {
    /// A configuration for pictures.
    pub fn video(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format: Some(pixel_format),
            ..Self::default()
        }
    }

    /// A configuration for audio.
    pub fn audio(sample_format: SampleFormat, sample_rate: u32, layout: ChannelLayout) -> Self {
        Self {
            sample_format: Some(sample_format),
            sample_rate,
            channel_layout: Some(layout),
            time_base: TimeBase::new(1, sample_rate as i64),
            ..Self::default()
        }
    }

    /// Set the time base.
    pub fn with_time_base(mut self, time_base: TimeBase) -> Self {
        self.time_base = time_base;
        self
    }

    /// Set the frame rate.
    pub fn with_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Set the sample aspect ratio.
    pub fn with_sample_aspect_ratio(mut self, sar: Rational) -> Self {
        self.sample_aspect_ratio = sar;
        self
    }

    /// Set the color description.
    pub fn with_color(mut self, color: ColorInfo) -> Self {
        self.color = color;
        self
    }

    /// Set the target bit rate.
    pub fn with_bit_rate(mut self, bit_rate: u64) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    /// Set the keyframe interval.
    pub fn with_gop_size(mut self, gop_size: u32) -> Self {
        self.gop_size = gop_size;
        self
    }

    /// Set the maximum number of consecutive B-frames.
    pub fn with_max_b_frames(mut self, max_b_frames: u32) -> Self {
        self.max_b_frames = max_b_frames;
        self
    }

    /// Set the decoder reordering window.
    pub fn with_reorder_depth(mut self, depth: usize) -> Self {
        self.reorder_depth = depth;
        self
    }

    /// Set the worker thread count (0 = auto).
    pub fn with_threads(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    /// Set the allowed threading strategies.
    pub fn with_thread_type(mut self, thread_type: ThreadType) -> Self {
        self.thread_type = thread_type;
        self
    }

    /// Set behavior flags.
    pub fn with_flags(mut self, flags: CoderFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the queue capacity (clamped to at least 1).
    pub fn with_max_buffered_units(mut self, units: usize) -> Self {
        self.max_buffered_units = units.max(1);
        self
    }

    /// Set extradata.
    pub fn with_extradata(mut self, extradata: impl Into<Vec<u8>>) -> Self {
        self.extradata = extradata.into();
        self
    }

    /// Effective number of worker threads.
    pub fn effective_threads(&self) -> usize {
        if self.thread_count == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1)
        } else {
            self.thread_count
        }
    }

    /// Check that the fields needed by a coder of `media_type` are present.
    pub fn validate_for(&self, media_type: MediaType) -> Result<()> {
        match media_type {
            MediaType::Video => {
                if self.pixel_format.is_none() {
                    return Err(Error::negotiation("pixel format is not set"));
                }
                if self.width == 0 || self.height == 0 {
                    return Err(Error::negotiation(format!(
                        "invalid dimensions {}x{}",
                        self.width, self.height
                    )));
                }
            }
            MediaType::Audio => {
                if self.sample_rate == 0 {
                    return Err(Error::negotiation("sample rate is not set"));
                }
                if self.channel_layout.map_or(true, |l| l.channels() == 0) {
                    return Err(Error::negotiation("channel layout is not set"));
                }
            }
        }
        Ok(())
    }

    /// Set a field from its textual option name and value.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "width" | "w" => self.width = parse_num(key, value)?,
            "height" | "h" => self.height = parse_num(key, value)?,
            "pix_fmt" => self.pixel_format = Some(value.parse().map_err(Error::InvalidParameter)?),
            "sample_fmt" => {
                self.sample_format = Some(value.parse().map_err(Error::InvalidParameter)?)
            }
            "sample_rate" | "ar" => self.sample_rate = parse_num(key, value)?,
            "ch_layout" => {
                self.channel_layout = Some(value.parse().map_err(Error::InvalidParameter)?)
            }
            "b" => self.bit_rate = parse_bit_rate(value)?,
            "threads" => {
                self.thread_count = if value.eq_ignore_ascii_case("auto") {
                    0
                } else {
                    parse_num(key, value)?
                }
            }
            "thread_type" => self.thread_type = parse_thread_type(value)?,
            "g" => self.gop_size = parse_num(key, value)?,
            "bf" => self.max_b_frames = parse_num(key, value)?,
            "queue_size" => {
                let units: usize = parse_num(key, value)?;
                if units == 0 {
                    return Err(Error::invalid_param("queue_size must be at least 1"));
                }
                self.max_buffered_units = units;
            }
            "reorder_depth" => self.reorder_depth = parse_num(key, value)?,
            "flags" => self.flags = parse_flags(self.flags, value)?,
            "time_base" => {
                let tb: Rational = value.parse().map_err(Error::InvalidParameter)?;
                self.time_base = TimeBase::from(tb);
            }
            "r" | "frame_rate" => self.frame_rate = value.parse().map_err(Error::InvalidParameter)?,
            _ => return Err(Error::invalid_param(format!("unknown option '{key}'"))),
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::invalid_param(format!("invalid value '{value}' for option '{key}'")))
}

fn parse_bit_rate(value: &str) -> Result<u64> {
    let (digits, scale) = match value.char_indices().last() {
        Some((i, 'k' | 'K')) => (&value[..i], 1_000),
        Some((i, 'M')) => (&value[..i], 1_000_000),
        Some((i, 'G')) => (&value[..i], 1_000_000_000),
        _ => (value, 1),
    };
    let base: f64 = parse_num("b", digits)?;
    if !base.is_finite() || base < 0.0 {
        return Err(Error::invalid_param(format!("invalid bit rate '{value}'")));
    }
    Ok((base * scale as f64).round() as u64)
}

fn parse_thread_type(value: &str) -> Result<ThreadType> {
    let mut thread_type = ThreadType::empty();
    for token in value.split(['+', '|', ',']).filter(|t| !t.is_empty()) {
        thread_type |= match token {
            "frame" => ThreadType::FRAME,
            "slice" => ThreadType::SLICE,
            "none" => ThreadType::empty(),
            other => return Err(Error::invalid_param(format!("unknown thread type '{other}'"))),
        };
    }
    Ok(thread_type)
}

fn coder_flag(name: &str) -> Result<CoderFlags> {
    match name {
        "low_delay" => Ok(CoderFlags::LOW_DELAY),
        "bitexact" => Ok(CoderFlags::BITEXACT),
        "global_header" => Ok(CoderFlags::GLOBAL_HEADER),
        "output_corrupt" => Ok(CoderFlags::OUTPUT_CORRUPT),
        other => Err(Error::invalid_param(format!("unknown flag '{other}'"))),
    }
}

/// Parse `"+a-b"` style flag edits relative to `current`; a value that does
/// not start with a sign replaces the set.
fn parse_flags(current: CoderFlags, value: &str) -> Result<CoderFlags> {
    let mut flags = if value.starts_with(['+', '-']) {
        current
    } else {
        CoderFlags::empty()
    };
    let mut sign = '+';
    let mut name = String::new();
    for ch in value.chars().chain(std::iter::once('+')) {
        if ch == '+' || ch == '-' {
            if !name.is_empty() {
                let flag = coder_flag(&name)?;
                flags.set(flag, sign == '+');
                name.clear();
            }
            sign = ch;
        } else {
            name.push(ch);
        }
    }
    Ok(flags)
}

/// Facts settled at open time.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Negotiated {
    /// Units of output lag, including frame-threading delay.
    pub delay: usize,
    /// Reordering window in use.
    pub reorder_depth: usize,
    /// Samples per frame an encoder expects (0 = any).
    pub frame_size: usize,
    /// Threading strategy in use.
    pub thread_type: ThreadType,
    /// Worker threads in use.
    pub thread_count: usize,
    /// Extradata produced by an encoder.
    pub extradata: Vec<u8>,
    /// Pixel format of produced pictures.
    pub pixel_format: Option<PixelFormat>,
    /// Sample format of produced audio.
    pub sample_format: Option<SampleFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = CoderConfig::video(1920, 1080, PixelFormat::Yuv420p)
            .with_max_b_frames(2)
            .with_threads(4)
            .with_max_buffered_units(0);
        assert_eq!(config.width, 1920);
        assert_eq!(config.max_b_frames, 2);
        assert_eq!(config.effective_threads(), 4);
        assert_eq!(config.max_buffered_units, 1);
        assert!(config.validate_for(MediaType::Video).is_ok());
        assert!(config.validate_for(MediaType::Audio).is_err());
    }

    #[test]
    fn test_audio_time_base() {
        let config = CoderConfig::audio(SampleFormat::S16, 48000, ChannelLayout::Stereo);
        assert_eq!(config.time_base, TimeBase::new(1, 48000));
        assert!(config.validate_for(MediaType::Audio).is_ok());
    }

    #[test]
    fn test_set_option() {
        let mut config = CoderConfig::default();
        config.set_option("width", "640").unwrap();
        config.set_option("height", "480").unwrap();
        config.set_option("pix_fmt", "nv12").unwrap();
        config.set_option("b", "2.5M").unwrap();
        config.set_option("threads", "auto").unwrap();
        config.set_option("thread_type", "slice").unwrap();
        config.set_option("bf", "1").unwrap();
        config.set_option("ch_layout", "5.1").unwrap();
        assert_eq!(config.pixel_format, Some(PixelFormat::Nv12));
        assert_eq!(config.bit_rate, 2_500_000);
        assert_eq!(config.thread_count, 0);
        assert_eq!(config.thread_type, ThreadType::SLICE);
        assert_eq!(config.max_b_frames, 1);
        assert_eq!(config.channel_layout, Some(ChannelLayout::Surround51));
    }

    #[test]
    fn test_set_option_errors() {
        let mut config = CoderConfig::default();
        assert!(config.set_option("width", "wide").is_err());
        assert!(config.set_option("nope", "1").is_err());
        assert!(config.set_option("queue_size", "0").is_err());
        assert!(config.set_option("pix_fmt", "yuv999").is_err());
        assert_eq!(config, CoderConfig::default());
    }

    #[test]
    fn test_flags_syntax() {
        let mut config = CoderConfig::default();
        config.set_option("flags", "low_delay+bitexact").unwrap();
        assert_eq!(config.flags, CoderFlags::LOW_DELAY | CoderFlags::BITEXACT);
        config.set_option("flags", "-bitexact+global_header").unwrap();
        assert_eq!(config.flags, CoderFlags::LOW_DELAY | CoderFlags::GLOBAL_HEADER);
        config.set_option("flags", "output_corrupt").unwrap();
        assert_eq!(config.flags, CoderFlags::OUTPUT_CORRUPT);
        assert!(config.set_option("flags", "+turbo").is_err());
    }

    #[test]
    fn test_bit_rate_suffixes() {
        assert_eq!(parse_bit_rate("128k").unwrap(), 128_000);
        assert_eq!(parse_bit_rate("1000").unwrap(), 1000);
        assert!(parse_bit_rate("-1k").is_err());
    }
}
