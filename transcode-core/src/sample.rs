//! Audio sample formats and channel layouts.

use std::fmt;
use std::str::FromStr;

/// Sample format for audio data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleFormat {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit, native endian.
    S16,
    /// Signed 32-bit, native endian.
    S32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Unsigned 8-bit planar.
    U8p,
    /// Signed 16-bit planar.
    S16p,
    /// Signed 32-bit planar.
    S32p,
    /// 32-bit float planar.
    F32p,
    /// 64-bit float planar.
    F64p,
}

impl SampleFormat {
    /// Get the number of bytes per sample.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 | Self::U8p => 1,
            Self::S16 | Self::S16p => 2,
            Self::S32 | Self::S32p | Self::F32 | Self::F32p => 4,
            Self::F64 | Self::F64p => 8,
        }
    }

    /// Check if this is a planar format.
    pub fn is_planar(&self) -> bool {
        matches!(self, Self::U8p | Self::S16p | Self::S32p | Self::F32p | Self::F64p)
    }

    /// Number of data planes a frame of this format carries.
    pub fn plane_count(&self, channels: usize) -> usize {
        if self.is_planar() {
            channels
        } else {
            1
        }
    }

    /// Get the packed equivalent of this format.
    pub fn to_packed(&self) -> Self {
        match self {
            Self::U8p => Self::U8,
            Self::S16p => Self::S16,
            Self::S32p => Self::S32,
            Self::F32p => Self::F32,
            Self::F64p => Self::F64,
            other => *other,
        }
    }

    /// Short name as used in option strings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::F32 => "flt",
            Self::F64 => "dbl",
            Self::U8p => "u8p",
            Self::S16p => "s16p",
            Self::S32p => "s32p",
            Self::F32p => "fltp",
            Self::F64p => "dblp",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [SampleFormat; 10] = [
            SampleFormat::U8,
            SampleFormat::S16,
            SampleFormat::S32,
            SampleFormat::F32,
            SampleFormat::F64,
            SampleFormat::U8p,
            SampleFormat::S16p,
            SampleFormat::S32p,
            SampleFormat::F32p,
            SampleFormat::F64p,
        ];
        ALL.into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown sample format '{s}'"))
    }
}

/// Channel layout for audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelLayout {
    /// Mono (1 channel).
    Mono,
    /// Stereo (2 channels: left, right).
    #[default]
    Stereo,
    /// 2.1 (3 channels: left, right, LFE).
    Surround21,
    /// Quad (4 channels: FL, FR, BL, BR).
    Quad,
    /// 5.0 (5 channels: FL, FR, FC, BL, BR).
    Surround50,
    /// 5.1 (6 channels: FL, FR, FC, LFE, BL, BR).
    Surround51,
    /// 7.1 (8 channels: FL, FR, FC, LFE, BL, BR, SL, SR).
    Surround71,
    /// Unspecified order with the given channel count.
    Custom(u32),
}

impl ChannelLayout {
    /// Get the number of channels.
    pub fn channels(&self) -> u32 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround21 => 3,
            Self::Quad => 4,
            Self::Surround50 => 5,
            Self::Surround51 => 6,
            Self::Surround71 => 8,
            Self::Custom(n) => *n,
        }
    }

    /// Default layout for a channel count.
    pub fn from_channels(channels: u32) -> Self {
        match channels {
            1 => Self::Mono,
            2 => Self::Stereo,
            3 => Self::Surround21,
            4 => Self::Quad,
            5 => Self::Surround50,
            6 => Self::Surround51,
            8 => Self::Surround71,
            n => Self::Custom(n),
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => write!(f, "mono"),
            Self::Stereo => write!(f, "stereo"),
            Self::Surround21 => write!(f, "2.1"),
            Self::Quad => write!(f, "quad"),
            Self::Surround50 => write!(f, "5.0"),
            Self::Surround51 => write!(f, "5.1"),
            Self::Surround71 => write!(f, "7.1"),
            Self::Custom(n) => write!(f, "{}c", n),
        }
    }
}

impl FromStr for ChannelLayout {
    type Err = String;

    /// Accepts layout names (`"stereo"`, `"5.1"`) or channel counts (`"12c"`, `"12"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mono" => Ok(Self::Mono),
            "stereo" => Ok(Self::Stereo),
            "2.1" => Ok(Self::Surround21),
            "quad" => Ok(Self::Quad),
            "5.0" => Ok(Self::Surround50),
            "5.1" => Ok(Self::Surround51),
            "7.1" => Ok(Self::Surround71),
            other => other
                .trim_end_matches('c')
                .parse::<u32>()
                .ok()
                .filter(|&n| n > 0)
                .map(Self::from_channels)
                .ok_or_else(|| format!("unknown channel layout '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_count() {
        assert_eq!(SampleFormat::S16.plane_count(6), 1);
        assert_eq!(SampleFormat::F32p.plane_count(6), 6);
    }

    #[test]
    fn test_parse_sample_format() {
        assert_eq!("fltp".parse::<SampleFormat>().unwrap(), SampleFormat::F32p);
        assert!("s24".parse::<SampleFormat>().is_err());
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!("5.1".parse::<ChannelLayout>().unwrap(), ChannelLayout::Surround51);
        assert_eq!("12c".parse::<ChannelLayout>().unwrap(), ChannelLayout::Custom(12));
        assert_eq!("2".parse::<ChannelLayout>().unwrap(), ChannelLayout::Stereo);
        assert!("0c".parse::<ChannelLayout>().is_err());
    }
}
