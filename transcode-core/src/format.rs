//! Media type and algorithm identifiers.

use std::fmt;
use std::str::FromStr;

/// Kind of media a unit or coder carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MediaType {
    /// Pictures.
    Video,
    /// Sound samples.
    Audio,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Identity of a coding algorithm, independent of direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum CodecId {
    /// Uncompressed pictures, planes stored back to back.
    RawVideo,
    /// Signed 16-bit little-endian PCM.
    PcmS16le,
    /// Signed 16-bit big-endian PCM.
    PcmS16be,
    /// 32-bit float little-endian PCM.
    PcmF32le,
    /// Unsigned 8-bit PCM.
    PcmU8,
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    Hevc,
    /// AV1.
    Av1,
    /// AAC.
    Aac,
    /// Opus.
    Opus,
}

impl CodecId {
    /// Media type handled by this algorithm.
    pub fn media_type(&self) -> MediaType {
        match self {
            Self::RawVideo | Self::H264 | Self::Hevc | Self::Av1 => MediaType::Video,
            Self::PcmS16le
            | Self::PcmS16be
            | Self::PcmF32le
            | Self::PcmU8
            | Self::Aac
            | Self::Opus => MediaType::Audio,
        }
    }

    /// Short canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RawVideo => "rawvideo",
            Self::PcmS16le => "pcm_s16le",
            Self::PcmS16be => "pcm_s16be",
            Self::PcmF32le => "pcm_f32le",
            Self::PcmU8 => "pcm_u8",
            Self::H264 => "h264",
            Self::Hevc => "hevc",
            Self::Av1 => "av1",
            Self::Aac => "aac",
            Self::Opus => "opus",
        }
    }

    /// Check whether this is a lossless PCM variant.
    pub fn is_pcm(&self) -> bool {
        matches!(self, Self::PcmS16le | Self::PcmS16be | Self::PcmF32le | Self::PcmU8)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rawvideo" => Ok(Self::RawVideo),
            "pcm_s16le" => Ok(Self::PcmS16le),
            "pcm_s16be" => Ok(Self::PcmS16be),
            "pcm_f32le" => Ok(Self::PcmF32le),
            "pcm_u8" => Ok(Self::PcmU8),
            "h264" | "avc" => Ok(Self::H264),
            "hevc" | "h265" => Ok(Self::Hevc),
            "av1" => Ok(Self::Av1),
            "aac" => Ok(Self::Aac),
            "opus" => Ok(Self::Opus),
            other => Err(format!("unknown codec '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type() {
        assert_eq!(CodecId::RawVideo.media_type(), MediaType::Video);
        assert_eq!(CodecId::PcmS16le.media_type(), MediaType::Audio);
    }

    #[test]
    fn test_name_roundtrip() {
        for id in [CodecId::RawVideo, CodecId::PcmU8, CodecId::Hevc] {
            assert_eq!(id.name().parse::<CodecId>().unwrap(), id);
        }
        assert_eq!("AVC".parse::<CodecId>().unwrap(), CodecId::H264);
        assert!("mpeg9".parse::<CodecId>().is_err());
    }
}
