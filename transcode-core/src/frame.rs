//! Raw media units: decoded pictures and audio samples.
//!
//! A [`Frame`] holds up to [`MAX_INLINE_PLANES`] planes inline and any further
//! planes (planar audio with many channels) in an overflow list. Every plane is
//! either borrowed caller memory or a range of a [`SharedBuffer`], so
//! referencing a frame never copies pixel or sample data unless the source was
//! borrowed.

use crate::buffer::SharedBuffer;
use crate::error::{Error, Result};
use crate::opaque::Opaque;
use crate::pixel::{ColorInfo, PixelFormat};
use crate::rational::Rational;
use crate::sample::{ChannelLayout, SampleFormat};
use crate::side_data::{FrameSideDataType, SideDataSet};
use crate::timestamp::TimeBase;
use bitflags::bitflags;
use std::fmt;

/// Number of plane slots stored inline in a frame.
pub const MAX_INLINE_PLANES: usize = 8;

/// Default stride and crop alignment in bytes.
pub const FRAME_ALIGN: usize = 32;

/// Round `size` up to a multiple of `alignment` (a power of two).
pub fn align_up(size: usize, alignment: usize) -> usize {
    (size + alignment - 1) & !(alignment - 1)
}

bitflags! {
    /// Frame flags indicating frame properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        /// This is a keyframe (I-frame).
        const KEYFRAME = 0x0001;
        /// Frame is corrupted or incomplete.
        const CORRUPT = 0x0002;
        /// Frame should be discarded after decoding (used for reference only).
        const DISCARD = 0x0004;
        /// Interlaced frame.
        const INTERLACED = 0x0008;
        /// Top field first (for interlaced content).
        const TOP_FIELD_FIRST = 0x0010;
    }
}

bitflags! {
    /// Options for [`Frame::apply_cropping`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CropFlags: u32 {
        /// Apply the exact left margin even if plane pointers lose alignment.
        const UNALIGNED = 0x0001;
    }
}

/// Sample layout of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameFormat {
    /// Not yet described.
    #[default]
    Unset,
    /// Picture with the given pixel format.
    Video(PixelFormat),
    /// Audio with the given sample format.
    Audio(SampleFormat),
}

/// Margins to remove from each edge of a picture, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CropRect {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl CropRect {
    /// Check whether no cropping is requested.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Row length and row count of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneGeometry {
    /// Meaningful bytes per row.
    pub row_bytes: usize,
    /// Number of rows.
    pub rows: usize,
}

#[derive(Clone)]
enum PlaneStorage<'a> {
    Borrowed(&'a [u8]),
    Shared(SharedBuffer),
}

/// One data plane of a frame.
#[derive(Clone)]
pub struct Plane<'a> {
    storage: PlaneStorage<'a>,
    offset: usize,
    len: usize,
    stride: usize,
}

impl<'a> Plane<'a> {
    /// A plane spanning an entire shared buffer.
    pub fn from_buffer(buf: SharedBuffer, stride: usize) -> Plane<'static> {
        let len = buf.len();
        Plane {
            storage: PlaneStorage::Shared(buf),
            offset: 0,
            len,
            stride,
        }
    }

    /// A plane over `len` bytes of `buf` starting at `offset`.
    pub fn from_buffer_range(
        buf: SharedBuffer,
        offset: usize,
        len: usize,
        stride: usize,
    ) -> Result<Plane<'static>> {
        if offset.checked_add(len).map_or(true, |end| end > buf.len()) {
            return Err(Error::invalid_param(format!(
                "plane range {offset}+{len} exceeds buffer of {} bytes",
                buf.len()
            )));
        }
        Ok(Plane {
            storage: PlaneStorage::Shared(buf),
            offset,
            len,
            stride,
        })
    }

    /// A plane over caller memory that is not reference counted.
    pub fn borrowed(data: &'a [u8], stride: usize) -> Self {
        Self {
            storage: PlaneStorage::Borrowed(data),
            offset: 0,
            len: data.len(),
            stride,
        }
    }

    /// Plane bytes.
    pub fn data(&self) -> &[u8] {
        let all = match &self.storage {
            PlaneStorage::Borrowed(data) => data,
            PlaneStorage::Shared(buf) => buf.data(),
        };
        &all[self.offset..self.offset + self.len]
    }

    /// Mutable plane bytes, only for exclusively owned shared storage.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.storage {
            PlaneStorage::Borrowed(_) => None,
            PlaneStorage::Shared(buf) => {
                let range = self.offset..self.offset + self.len;
                buf.data_mut().map(|d| &mut d[range])
            }
        }
    }

    /// Bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Backing buffer, if reference counted.
    pub fn buffer(&self) -> Option<&SharedBuffer> {
        match &self.storage {
            PlaneStorage::Borrowed(_) => None,
            PlaneStorage::Shared(buf) => Some(buf),
        }
    }

    /// True when the plane can be written in place.
    pub fn is_writable(&self) -> bool {
        matches!(&self.storage, PlaneStorage::Shared(buf) if buf.is_writable())
    }

    fn to_shared(&self) -> Result<Plane<'static>> {
        match &self.storage {
            PlaneStorage::Shared(buf) => Ok(Plane {
                storage: PlaneStorage::Shared(buf.clone()),
                offset: self.offset,
                len: self.len,
                stride: self.stride,
            }),
            PlaneStorage::Borrowed(_) => self.to_copy(),
        }
    }

    fn to_copy(&self) -> Result<Plane<'static>> {
        let buf = SharedBuffer::copy_from_slice(self.data())?;
        Ok(Plane::from_buffer(buf, self.stride))
    }

    fn advance(&mut self, bytes: usize) {
        let bytes = bytes.min(self.len);
        self.offset += bytes;
        self.len -= bytes;
    }
}

impl fmt::Debug for Plane<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plane")
            .field("len", &self.len)
            .field("stride", &self.stride)
            .field("shared", &self.buffer().is_some())
            .finish()
    }
}

/// A raw picture or block of audio samples.
#[derive(Clone, Default)]
pub struct Frame<'a> {
    planes: [Option<Plane<'a>>; MAX_INLINE_PLANES],
    extended_planes: Vec<Plane<'a>>,
    /// Pixel or sample format.
    pub format: FrameFormat,
    /// Picture width in pixels.
    pub width: u32,
    /// Picture height in pixels.
    pub height: u32,
    /// Sample aspect ratio, unknown when the denominator is zero.
    pub sample_aspect_ratio: Rational,
    /// Pending crop margins.
    pub crop: CropRect,
    /// Color description.
    pub color: ColorInfo,
    /// Audio channel layout.
    pub channel_layout: Option<ChannelLayout>,
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// Audio samples per channel.
    pub nb_samples: usize,
    /// Presentation timestamp in `time_base` units.
    pub pts: Option<i64>,
    /// Decode timestamp of the packet that produced this frame.
    pub pkt_dts: Option<i64>,
    /// Duration in `time_base` units, 0 if unknown.
    pub duration: i64,
    /// Unit of `pts`, `pkt_dts` and `duration`.
    pub time_base: TimeBase,
    /// Frame flags.
    pub flags: FrameFlags,
    /// Caller tag.
    pub opaque: Option<Opaque>,
    side_data: SideDataSet<FrameSideDataType>,
}

impl<'a> Frame<'a> {
    /// An unreferenced frame with default fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe a picture; call [`Frame::alloc_buffers`] to get planes.
    pub fn video(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            format: FrameFormat::Video(format),
            width,
            height,
            ..Self::default()
        }
    }

    /// Describe a block of audio; call [`Frame::alloc_buffers`] to get planes.
    pub fn audio(
        format: SampleFormat,
        layout: ChannelLayout,
        sample_rate: u32,
        nb_samples: usize,
    ) -> Self {
        Self {
            format: FrameFormat::Audio(format),
            channel_layout: Some(layout),
            sample_rate,
            nb_samples,
            ..Self::default()
        }
    }

    /// Pixel format, for pictures.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        match self.format {
            FrameFormat::Video(f) => Some(f),
            _ => None,
        }
    }

    /// Sample format, for audio.
    pub fn sample_format(&self) -> Option<SampleFormat> {
        match self.format {
            FrameFormat::Audio(f) => Some(f),
            _ => None,
        }
    }

    /// Number of audio channels (0 for pictures).
    pub fn channels(&self) -> usize {
        self.channel_layout.map_or(0, |l| l.channels() as usize)
    }

    /// Check if this is a keyframe.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(FrameFlags::KEYFRAME)
    }

    /// Number of planes with data.
    pub fn plane_count(&self) -> usize {
        self.planes.iter().take_while(|p| p.is_some()).count() + self.extended_planes.len()
    }

    /// Check whether the frame has any data planes.
    pub fn has_buffers(&self) -> bool {
        self.planes[0].is_some()
    }

    /// Plane `index`, looking into the overflow list past the inline slots.
    pub fn plane(&self, index: usize) -> Option<&Plane<'a>> {
        if index < MAX_INLINE_PLANES {
            self.planes[index].as_ref()
        } else {
            self.extended_planes.get(index - MAX_INLINE_PLANES)
        }
    }

    fn plane_slot_mut(&mut self, index: usize) -> Option<&mut Plane<'a>> {
        if index < MAX_INLINE_PLANES {
            self.planes[index].as_mut()
        } else {
            self.extended_planes.get_mut(index - MAX_INLINE_PLANES)
        }
    }

    /// Bytes of plane `index`.
    pub fn data(&self, index: usize) -> Option<&[u8]> {
        self.plane(index).map(Plane::data)
    }

    /// Mutable bytes of plane `index`, if that plane is exclusively owned.
    pub fn data_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.plane_slot_mut(index).and_then(Plane::data_mut)
    }

    /// Stride of plane `index`, 0 if absent.
    pub fn stride(&self, index: usize) -> usize {
        self.plane(index).map_or(0, Plane::stride)
    }

    /// Iterate over planes in order.
    pub fn planes(&self) -> impl Iterator<Item = &Plane<'a>> + '_ {
        self.planes.iter().map_while(Option::as_ref).chain(self.extended_planes.iter())
    }

    /// Replace all planes.
    pub fn set_planes(&mut self, planes: Vec<Plane<'a>>) {
        self.planes = Default::default();
        self.extended_planes.clear();
        let mut iter = planes.into_iter();
        for slot in self.planes.iter_mut() {
            match iter.next() {
                Some(plane) => *slot = Some(plane),
                None => return,
            }
        }
        self.extended_planes.extend(iter);
    }

    /// Per-plane geometry implied by the format fields.
    pub fn plane_geometry(&self) -> Result<Vec<PlaneGeometry>> {
        match self.format {
            FrameFormat::Video(fmt) => {
                if self.width == 0 || self.height == 0 {
                    return Err(Error::invalid_param("picture dimensions are not set"));
                }
                Ok((0..fmt.num_planes())
                    .map(|p| PlaneGeometry {
                        row_bytes: fmt.plane_row_bytes(p, self.width),
                        rows: fmt.plane_rows(p, self.height),
                    })
                    .collect())
            }
            FrameFormat::Audio(fmt) => {
                let channels = self.channels();
                if channels == 0 || self.nb_samples == 0 {
                    return Err(Error::invalid_param("audio layout or sample count is not set"));
                }
                let per_channel = self.nb_samples * fmt.bytes_per_sample();
                let row_bytes = if fmt.is_planar() {
                    per_channel
                } else {
                    per_channel * channels
                };
                Ok(vec![PlaneGeometry { row_bytes, rows: 1 }; fmt.plane_count(channels)])
            }
            FrameFormat::Unset => Err(Error::invalid_param("frame format is not set")),
        }
    }

    /// Allocate zeroed planes for the described format with `align`-byte strides.
    pub fn alloc_buffers(&mut self, align: usize) -> Result<()> {
        self.alloc_buffers_with(align, SharedBuffer::alloc)
    }

    /// Allocate planes through `alloc`, which receives each plane size.
    ///
    /// All planes are allocated before any is installed, so a failure leaves
    /// the frame untouched.
    pub fn alloc_buffers_with<F>(&mut self, align: usize, mut alloc: F) -> Result<()>
    where
        F: FnMut(usize) -> Result<SharedBuffer>,
    {
        if self.has_buffers() {
            return Err(Error::invalid_param("frame already has buffers"));
        }
        if align == 0 || !align.is_power_of_two() {
            return Err(Error::invalid_param(format!("alignment {align} is not a power of two")));
        }
        let geometry = self.plane_geometry()?;
        let mut planes = Vec::with_capacity(geometry.len());
        for g in &geometry {
            let stride = align_up(g.row_bytes, align);
            let buf = alloc(stride * g.rows)?;
            planes.push(Plane::from_buffer(buf, stride));
        }
        self.set_planes(planes);
        Ok(())
    }

    /// A new frame referencing the same buffers.
    ///
    /// Borrowed planes are copied into fresh shared buffers.
    pub fn try_ref(&self) -> Result<Frame<'static>> {
        let planes = self.planes().map(Plane::to_shared).collect::<Result<Vec<_>>>()?;
        let mut dst = Frame::<'static>::new();
        dst.set_planes(planes);
        dst.format = self.format;
        dst.width = self.width;
        dst.height = self.height;
        dst.channel_layout = self.channel_layout;
        dst.nb_samples = self.nb_samples;
        dst.copy_props(self);
        Ok(dst)
    }

    /// Drop every buffer reference and reset all fields.
    pub fn unref(&mut self) {
        *self = Self::default();
    }

    /// Take the contents out, leaving this frame unreferenced.
    pub fn move_ref(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Check whether every plane can be written in place.
    pub fn is_writable(&self) -> bool {
        self.has_buffers() && self.planes().all(Plane::is_writable)
    }

    /// Ensure every plane is exclusively owned, copying shared or borrowed ones.
    pub fn make_writable(&mut self) -> Result<()> {
        let mut copies = Vec::new();
        for (index, plane) in self.planes().enumerate() {
            if !plane.is_writable() {
                copies.push((index, plane.to_copy()?));
            }
        }
        for (index, copy) in copies {
            if let Some(slot) = self.plane_slot_mut(index) {
                *slot = copy;
            }
        }
        Ok(())
    }

    /// Copy every property except buffers and layout from `src`.
    ///
    /// Side data entries are cloned with new buffer references.
    pub fn copy_props(&mut self, src: &Frame<'_>) {
        self.sample_aspect_ratio = src.sample_aspect_ratio;
        self.crop = src.crop;
        self.color = src.color;
        self.sample_rate = src.sample_rate;
        self.pts = src.pts;
        self.pkt_dts = src.pkt_dts;
        self.duration = src.duration;
        self.time_base = src.time_base;
        self.flags = src.flags;
        self.opaque = src.opaque.clone();
        self.side_data = src.side_data.clone();
    }

    /// Copy plane contents from a frame with identical layout.
    pub fn copy_data(&mut self, src: &Frame<'_>) -> Result<()> {
        if self.format != src.format
            || self.width != src.width
            || self.height != src.height
            || self.nb_samples != src.nb_samples
            || self.channels() != src.channels()
        {
            return Err(Error::invalid_param("frame layouts differ"));
        }
        if !self.is_writable() {
            return Err(Error::invalid_param("destination frame is not writable"));
        }
        let geometry = src.plane_geometry()?;
        for (index, g) in geometry.iter().enumerate() {
            let dst_stride = self.plane(index).map(Plane::stride);
            let (Some(src_plane), Some(dst_stride)) = (src.plane(index), dst_stride) else {
                return Err(Error::invalid_param(format!("plane {index} is missing")));
            };
            let src_stride = src_plane.stride();
            let src_data = src_plane.data();
            let dst_data = self
                .data_mut(index)
                .ok_or_else(|| Error::invalid_param(format!("plane {index} is not writable")))?;
            for row in 0..g.rows {
                let s = row * src_stride;
                let d = row * dst_stride;
                let (Some(from), Some(to)) = (
                    src_data.get(s..s + g.row_bytes),
                    dst_data.get_mut(d..d + g.row_bytes),
                ) else {
                    return Err(Error::invalid_param(format!("plane {index} is too small")));
                };
                to.copy_from_slice(from);
            }
        }
        Ok(())
    }

    fn crop_offsets(&self, fmt: PixelFormat, top: u32, left: u32) -> Vec<usize> {
        let (hshift, vshift) = fmt.chroma_shift();
        self.planes()
            .enumerate()
            .map(|(index, plane)| {
                let (hs, vs) = if index == 0 { (0, 0) } else { (hshift, vshift) };
                let row = (top >> vs) as usize * plane.stride();
                row + (left >> hs) as usize * fmt.plane_step(index)
            })
            .collect()
    }

    /// Apply the crop margins destructively.
    ///
    /// Unless [`CropFlags::UNALIGNED`] is given, the left margin is rounded
    /// down so plane starts keep [`FRAME_ALIGN`]-byte alignment. On success the
    /// picture shrinks and the margins reset to zero; an out-of-range rectangle
    /// leaves the frame unchanged.
    pub fn apply_cropping(&mut self, flags: CropFlags) -> Result<()> {
        let FrameFormat::Video(fmt) = self.format else {
            return Err(Error::invalid_param("cropping requires a video frame"));
        };
        let CropRect { top, bottom, left, right } = self.crop;
        let horizontal = left.checked_add(right).filter(|&h| h < self.width);
        let vertical = top.checked_add(bottom).filter(|&v| v < self.height);
        if horizontal.is_none() || vertical.is_none() {
            return Err(Error::invalid_param(format!(
                "crop {:?} out of range for {}x{}",
                self.crop, self.width, self.height
            )));
        }

        let mut left = left;
        let mut offsets = self.crop_offsets(fmt, top, left);
        if !flags.contains(CropFlags::UNALIGNED) && left != 0 {
            let min_log2_align = offsets
                .iter()
                .filter(|&&o| o != 0)
                .map(|o| o.trailing_zeros())
                .min()
                .unwrap_or(u32::MAX);
            let target = FRAME_ALIGN.trailing_zeros();
            if min_log2_align < target {
                let reach = target + left.trailing_zeros();
                let bits = reach - min_log2_align.min(reach);
                left &= !((1u32 << bits.min(31)) - 1);
                offsets = self.crop_offsets(fmt, top, left);
            }
        }

        for (index, offset) in offsets.into_iter().enumerate() {
            if let Some(plane) = self.plane_slot_mut(index) {
                plane.advance(offset);
            }
        }
        self.width -= left + right;
        self.height -= top + bottom;
        self.crop = CropRect::default();
        Ok(())
    }

    /// Side data attached to this frame.
    pub fn side_data(&self) -> &SideDataSet<FrameSideDataType> {
        &self.side_data
    }

    /// Mutable side data.
    pub fn side_data_mut(&mut self) -> &mut SideDataSet<FrameSideDataType> {
        &mut self.side_data
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Frame");
        s.field("format", &self.format);
        match self.format {
            FrameFormat::Audio(_) => {
                s.field("nb_samples", &self.nb_samples)
                    .field("sample_rate", &self.sample_rate)
                    .field("layout", &self.channel_layout);
            }
            _ => {
                s.field("width", &self.width).field("height", &self.height);
            }
        }
        s.field("pts", &self.pts)
            .field("flags", &self.flags)
            .field("planes", &self.plane_count())
            .field("side_data", &self.side_data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side_data::{AddPolicy, SideDataValue};

    fn video_frame(width: u32, height: u32, format: PixelFormat) -> Frame<'static> {
        let mut frame = Frame::video(width, height, format);
        frame.alloc_buffers(FRAME_ALIGN).unwrap();
        frame
    }

    #[test]
    fn test_alloc_video_planes() {
        let frame = video_frame(100, 100, PixelFormat::Yuv420p);
        assert_eq!(frame.plane_count(), 3);
        assert_eq!(frame.stride(0) % 32, 0);
        assert_eq!(frame.stride(0), 128);
        assert_eq!(frame.data(1).unwrap().len(), 64 * 50);
        assert!(frame.is_writable());
    }

    #[test]
    fn test_alloc_rejects_unset_format() {
        let mut frame = Frame::new();
        assert!(frame.alloc_buffers(FRAME_ALIGN).is_err());
        assert!(!frame.has_buffers());
    }

    #[test]
    fn test_planar_audio_overflows_inline_slots() {
        let mut frame = Frame::audio(SampleFormat::F32p, ChannelLayout::Custom(12), 48000, 256);
        frame.alloc_buffers(FRAME_ALIGN).unwrap();
        assert_eq!(frame.plane_count(), 12);
        assert_eq!(frame.planes().count(), 12);
        assert_eq!(frame.data(11).unwrap().len(), 1024);
        assert!(frame.plane(12).is_none());
    }

    #[test]
    fn test_ref_and_unref_restore_count() {
        let frame = video_frame(16, 16, PixelFormat::Gray8);
        let buf = frame.plane(0).unwrap().buffer().unwrap().clone();
        assert_eq!(buf.ref_count(), 2);
        let mut clone = frame.try_ref().unwrap();
        assert_eq!(buf.ref_count(), 3);
        clone.unref();
        assert_eq!(buf.ref_count(), 2);
        assert_eq!(clone.format, FrameFormat::Unset);
    }

    #[test]
    fn test_make_writable_isolates_clone() {
        let mut a = video_frame(8, 8, PixelFormat::Gray8);
        a.data_mut(0).unwrap().fill(1);
        let mut b = a.try_ref().unwrap();
        assert!(!b.is_writable());
        b.make_writable().unwrap();
        b.data_mut(0).unwrap().fill(9);
        assert!(a.data(0).unwrap().iter().all(|&v| v == 1));
        assert!(a.is_writable());
    }

    #[test]
    fn test_borrowed_planes_are_copied_on_ref() {
        let bytes = vec![5u8; 64];
        let mut frame = Frame::video(8, 8, PixelFormat::Gray8);
        frame.set_planes(vec![Plane::borrowed(&bytes, 8)]);
        assert!(!frame.is_writable());
        let owned = frame.try_ref().unwrap();
        drop(frame);
        drop(bytes);
        assert!(owned.is_writable());
        assert_eq!(owned.data(0).unwrap()[0], 5);
    }

    #[test]
    fn test_move_ref_resets_source() {
        let mut a = video_frame(4, 4, PixelFormat::Gray8);
        a.pts = Some(3);
        let b = a.move_ref();
        assert_eq!(b.pts, Some(3));
        assert!(!a.has_buffers());
        assert_eq!(a.pts, None);
    }

    #[test]
    fn test_copy_props_clones_side_data() {
        let mut src = video_frame(4, 4, PixelFormat::Gray8);
        src.pts = Some(90);
        src.opaque = Some(Opaque::new("tag"));
        src.side_data_mut()
            .add(FrameSideDataType::Afd, SideDataValue::Afd(9), AddPolicy::Replace)
            .unwrap();
        let mut dst = Frame::new();
        dst.copy_props(&src);
        assert_eq!(dst.pts, Some(90));
        assert!(!dst.has_buffers());
        assert_eq!(dst.side_data().len(), 1);
        assert_eq!(dst.opaque.unwrap().downcast_ref::<&str>(), Some(&"tag"));
    }

    #[test]
    fn test_copy_data() {
        let mut src = video_frame(10, 4, PixelFormat::Yuv420p);
        src.data_mut(0).unwrap().fill(7);
        let mut dst = video_frame(10, 4, PixelFormat::Yuv420p);
        dst.copy_data(&src).unwrap();
        assert_eq!(dst.data(0).unwrap()[9], 7);

        let mut other = video_frame(12, 4, PixelFormat::Yuv420p);
        assert!(other.copy_data(&src).is_err());
    }

    #[test]
    fn test_crop_out_of_range_leaves_frame() {
        let mut frame = video_frame(16, 16, PixelFormat::Gray8);
        frame.crop = CropRect { left: 8, right: 8, ..Default::default() };
        assert!(frame.apply_cropping(CropFlags::empty()).is_err());
        assert_eq!(frame.width, 16);
        assert_eq!(frame.crop.left, 8);
    }

    #[test]
    fn test_crop_unaligned_exact() {
        let mut frame = video_frame(64, 16, PixelFormat::Gray8);
        for (i, b) in frame.data_mut(0).unwrap().iter_mut().enumerate() {
            *b = (i % 64) as u8;
        }
        frame.crop = CropRect { top: 2, bottom: 2, left: 3, right: 1 };
        frame.apply_cropping(CropFlags::UNALIGNED).unwrap();
        assert_eq!((frame.width, frame.height), (60, 12));
        assert_eq!(frame.data(0).unwrap()[0], 3);
        assert!(frame.crop.is_empty());
    }

    #[test]
    fn test_crop_rounds_left_to_alignment() {
        let mut frame = video_frame(128, 8, PixelFormat::Gray8);
        frame.crop = CropRect { left: 40, right: 8, ..Default::default() };
        frame.apply_cropping(CropFlags::empty()).unwrap();
        // 40 is rounded down to 32 so the luma start stays 32-byte aligned.
        assert_eq!(frame.width, 128 - 32 - 8);
        assert_eq!(frame.plane(0).unwrap().offset % FRAME_ALIGN, 0);
    }

    #[test]
    fn test_crop_audio_rejected() {
        let mut frame = Frame::audio(SampleFormat::S16, ChannelLayout::Stereo, 48000, 16);
        assert!(frame.apply_cropping(CropFlags::empty()).is_err());
    }
}
