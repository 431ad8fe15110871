//! Pixel formats and color metadata.

use std::fmt;
use std::str::FromStr;

/// Pixel format for video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp (1 Cr & Cb sample per 2x2 Y samples).
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp (1 Cr & Cb sample per 2x1 Y samples).
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp (no subsampling).
    Yuv444p,
    /// Planar YUV 4:2:0, 10-bit little-endian in 16-bit words.
    Yuv420p10le,
    /// Planar YUV 4:2:2, 10-bit little-endian in 16-bit words.
    Yuv422p10le,
    /// Planar YUV 4:4:4, 10-bit little-endian in 16-bit words.
    Yuv444p10le,
    /// Y plane followed by an interleaved UV plane.
    Nv12,
    /// Y plane followed by an interleaved VU plane.
    Nv21,
    /// Packed RGB24, 24bpp.
    Rgb24,
    /// Packed BGR24, 24bpp.
    Bgr24,
    /// Packed RGBA, 32bpp.
    Rgba,
    /// Packed BGRA, 32bpp.
    Bgra,
    /// Grayscale, 8bpp.
    Gray8,
    /// Grayscale, 16bpp little-endian.
    Gray16,
}

const ALL_PIXEL_FORMATS: [PixelFormat; 14] = [
    PixelFormat::Yuv420p,
    PixelFormat::Yuv422p,
    PixelFormat::Yuv444p,
    PixelFormat::Yuv420p10le,
    PixelFormat::Yuv422p10le,
    PixelFormat::Yuv444p10le,
    PixelFormat::Nv12,
    PixelFormat::Nv21,
    PixelFormat::Rgb24,
    PixelFormat::Bgr24,
    PixelFormat::Rgba,
    PixelFormat::Bgra,
    PixelFormat::Gray8,
    PixelFormat::Gray16,
];

impl PixelFormat {
    /// Get the number of planes for this pixel format.
    pub fn num_planes(&self) -> usize {
        match self {
            Self::Yuv420p
            | Self::Yuv422p
            | Self::Yuv444p
            | Self::Yuv420p10le
            | Self::Yuv422p10le
            | Self::Yuv444p10le => 3,
            Self::Nv12 | Self::Nv21 => 2,
            Self::Rgb24 | Self::Bgr24 | Self::Rgba | Self::Bgra | Self::Gray8 | Self::Gray16 => 1,
        }
    }

    /// Log2 of the chroma subsampling factors (horizontal, vertical).
    pub fn chroma_shift(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Yuv420p10le | Self::Nv12 | Self::Nv21 => (1, 1),
            Self::Yuv422p | Self::Yuv422p10le => (1, 0),
            _ => (0, 0),
        }
    }

    /// Check if this format stores more than 8 bits per component.
    pub fn is_high_bit_depth(&self) -> bool {
        matches!(
            self,
            Self::Yuv420p10le | Self::Yuv422p10le | Self::Yuv444p10le | Self::Gray16
        )
    }

    /// Bytes between horizontally adjacent pixels within `plane`.
    pub fn plane_step(&self, plane: usize) -> usize {
        match self {
            Self::Nv12 | Self::Nv21 if plane == 1 => 2,
            Self::Rgb24 | Self::Bgr24 => 3,
            Self::Rgba | Self::Bgra => 4,
            f if f.is_high_bit_depth() => 2,
            _ => 1,
        }
    }

    fn shifts_for(&self, plane: usize) -> (u32, u32) {
        if plane == 0 {
            (0, 0)
        } else {
            self.chroma_shift()
        }
    }

    /// Width of one row of `plane` in bytes, without padding.
    pub fn plane_row_bytes(&self, plane: usize, width: u32) -> usize {
        let (hshift, _) = self.shifts_for(plane);
        ceil_rshift(width, hshift) * self.plane_step(plane)
    }

    /// Number of rows in `plane`.
    pub fn plane_rows(&self, plane: usize, height: u32) -> usize {
        let (_, vshift) = self.shifts_for(plane);
        ceil_rshift(height, vshift)
    }

    /// Size in bytes of a tightly packed picture.
    pub fn image_size(&self, width: u32, height: u32) -> usize {
        (0..self.num_planes())
            .map(|p| self.plane_row_bytes(p, width) * self.plane_rows(p, height))
            .sum()
    }

    /// Short name as used in option strings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Yuv420p10le => "yuv420p10le",
            Self::Yuv422p10le => "yuv422p10le",
            Self::Yuv444p10le => "yuv444p10le",
            Self::Nv12 => "nv12",
            Self::Nv21 => "nv21",
            Self::Rgb24 => "rgb24",
            Self::Bgr24 => "bgr24",
            Self::Rgba => "rgba",
            Self::Bgra => "bgra",
            Self::Gray8 => "gray",
            Self::Gray16 => "gray16le",
        }
    }
}

fn ceil_rshift(value: u32, shift: u32) -> usize {
    ((value as usize) + (1 << shift) - 1) >> shift
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_ascii_lowercase();
        match s.as_str() {
            "gray8" => return Ok(Self::Gray8),
            "gray16" => return Ok(Self::Gray16),
            _ => {}
        }
        ALL_PIXEL_FORMATS
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown pixel format '{s}'"))
    }
}

/// Matrix coefficients used to derive luma and chroma from RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    /// Not signalled.
    #[default]
    Unspecified,
    /// BT.601 (SD video).
    Bt601,
    /// BT.709 (HD video).
    Bt709,
    /// BT.2020 non-constant luminance.
    Bt2020,
    /// Identity matrix (RGB).
    Rgb,
}

/// Chromaticity coordinates of the source primaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorPrimaries {
    /// Not signalled.
    #[default]
    Unspecified,
    /// BT.709 / sRGB.
    Bt709,
    /// BT.601 625-line.
    Bt470bg,
    /// BT.601 525-line.
    Smpte170m,
    /// BT.2020.
    Bt2020,
    /// DCI-P3 with D65 white point.
    DisplayP3,
}

/// Opto-electronic transfer characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorTransfer {
    /// Not signalled.
    #[default]
    Unspecified,
    /// BT.709.
    Bt709,
    /// IEC 61966-2-1 (sRGB).
    Srgb,
    /// SMPTE ST 2084 (PQ).
    Pq,
    /// ARIB STD-B67 (HLG).
    Hlg,
    /// Linear light.
    Linear,
}

/// Color range (limited/full).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorRange {
    /// Not signalled.
    #[default]
    Unspecified,
    /// Limited/TV range (16-235 for Y, 16-240 for UV).
    Limited,
    /// Full/PC range (0-255).
    Full,
}

/// Position of chroma samples relative to luma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChromaLocation {
    /// Not signalled.
    #[default]
    Unspecified,
    /// MPEG-2/4 4:2:0, H.264 default.
    Left,
    /// MPEG-1 4:2:0, JPEG.
    Center,
    /// ITU-R 601 top-left.
    TopLeft,
}

/// Color description attached to a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorInfo {
    /// Source primaries.
    pub primaries: ColorPrimaries,
    /// Transfer characteristic.
    pub transfer: ColorTransfer,
    /// YUV matrix.
    pub space: ColorSpace,
    /// Quantization range.
    pub range: ColorRange,
    /// Chroma siting.
    pub chroma_location: ChromaLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_planes() {
        assert_eq!(PixelFormat::Yuv420p.num_planes(), 3);
        assert_eq!(PixelFormat::Nv12.num_planes(), 2);
        assert_eq!(PixelFormat::Rgb24.num_planes(), 1);
    }

    #[test]
    fn test_odd_dimensions_round_up() {
        let f = PixelFormat::Yuv420p;
        assert_eq!(f.plane_row_bytes(1, 5), 3);
        assert_eq!(f.plane_rows(2, 3), 2);
        assert_eq!(f.image_size(4, 2), 8 + 2 + 2);
    }

    #[test]
    fn test_plane_steps() {
        assert_eq!(PixelFormat::Nv12.plane_step(0), 1);
        assert_eq!(PixelFormat::Nv12.plane_step(1), 2);
        assert_eq!(PixelFormat::Yuv420p10le.plane_row_bytes(1, 8), 8);
        assert_eq!(PixelFormat::Rgba.plane_row_bytes(0, 10), 40);
    }

    #[test]
    fn test_parse() {
        assert_eq!("YUV420P".parse::<PixelFormat>().unwrap(), PixelFormat::Yuv420p);
        assert_eq!("gray8".parse::<PixelFormat>().unwrap(), PixelFormat::Gray8);
        assert!("xyz".parse::<PixelFormat>().is_err());
    }
}
