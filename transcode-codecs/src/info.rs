//! Static descriptions of coding algorithms.

use bitflags::bitflags;
use std::fmt;
use transcode_core::{CodecId, MediaType, PixelFormat, SampleFormat};

bitflags! {
    /// What an algorithm can do beyond the basic one-in, one-out contract.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// Output may lag input; the algorithm must be drained at end of stream.
        const DELAY = 0x0001;
        /// Several inputs may be processed concurrently as one batch.
        const FRAME_THREADS = 0x0002;
        /// One input may be split into independently processed row slices.
        const SLICE_THREADS = 0x0004;
        /// Encoder accepts frames of any sample count.
        const VARIABLE_FRAME_SIZE = 0x0008;
        /// Encoder accepts a shorter final frame.
        const SMALL_LAST_FRAME = 0x0010;
        /// Output frames are allocated through the coder's frame allocator.
        const DR1 = 0x0020;
    }
}

/// Which way an algorithm transforms media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Packets in, frames out.
    Decode,
    /// Frames in, packets out.
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => write!(f, "decoder"),
            Self::Encode => write!(f, "encoder"),
        }
    }
}

/// Information about a codec implementation.
#[derive(Debug, Clone, Copy)]
pub struct CodecInfo {
    /// Codec name.
    pub name: &'static str,
    /// Long name/description.
    pub long_name: &'static str,
    /// Bitstream identifier.
    pub id: CodecId,
    /// Decoder or encoder.
    pub direction: Direction,
    /// Declared capabilities.
    pub capabilities: Capabilities,
    /// Accepted pixel formats; empty means any.
    pub pixel_formats: &'static [PixelFormat],
    /// Accepted sample formats; empty means any.
    pub sample_formats: &'static [SampleFormat],
    /// Accepted sample rates; empty means any.
    pub sample_rates: &'static [u32],
}

impl CodecInfo {
    /// Media type handled by this codec.
    pub fn media_type(&self) -> MediaType {
        self.id.media_type()
    }

    /// Check a capability.
    pub fn has(&self, cap: Capabilities) -> bool {
        self.capabilities.contains(cap)
    }

    /// Check whether `format` is accepted.
    pub fn supports_pixel_format(&self, format: PixelFormat) -> bool {
        self.pixel_formats.is_empty() || self.pixel_formats.contains(&format)
    }

    /// Check whether `format` is accepted.
    pub fn supports_sample_format(&self, format: SampleFormat) -> bool {
        self.sample_formats.is_empty() || self.sample_formats.contains(&format)
    }

    /// Check whether `rate` is accepted.
    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.sample_rates.is_empty() || self.sample_rates.contains(&rate)
    }
}

impl fmt::Display for CodecInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.direction, self.long_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: CodecInfo = CodecInfo {
        name: "test",
        long_name: "Test codec",
        id: CodecId::PcmS16le,
        direction: Direction::Decode,
        capabilities: Capabilities::DR1,
        pixel_formats: &[],
        sample_formats: &[SampleFormat::S16],
        sample_rates: &[],
    };

    #[test]
    fn test_format_support() {
        assert!(INFO.supports_sample_format(SampleFormat::S16));
        assert!(!INFO.supports_sample_format(SampleFormat::F32));
        assert!(INFO.supports_sample_rate(44100));
        assert_eq!(INFO.media_type(), MediaType::Audio);
        assert!(INFO.has(Capabilities::DR1));
        assert!(!INFO.has(Capabilities::DELAY));
    }

    #[test]
    fn test_display() {
        assert_eq!(INFO.to_string(), "test decoder (Test codec)");
    }
}
