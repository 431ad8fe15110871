//! Packet abstractions for encoded media data.
//!
//! Packets contain compressed/encoded data before decoding or after encoding.
//! Reference-counted packet payloads are always followed by
//! [`INPUT_BUFFER_PADDING_SIZE`] zero bytes.

use crate::buffer::{try_alloc_zeroed, SharedBuffer, INPUT_BUFFER_PADDING_SIZE};
use crate::error::{Error, Result};
use crate::opaque::Opaque;
use crate::side_data::{PacketSideDataType, SideDataSet};
use crate::timestamp::TimeBase;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flags for packet properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// This packet contains a keyframe.
        const KEYFRAME = 0x0001;
        /// Packet data is corrupted.
        const CORRUPT = 0x0002;
        /// Packet should be discarded after decoding.
        const DISCARD = 0x0004;
        /// Packet comes from a trusted source and may carry internal pointers.
        const TRUSTED = 0x0008;
        /// Packet contains a disposable frame (can be dropped).
        const DISPOSABLE = 0x0010;
    }
}

#[derive(Clone)]
enum PacketData<'a> {
    Empty,
    Borrowed(&'a [u8]),
    Shared {
        buf: SharedBuffer,
        offset: usize,
        len: usize,
    },
}

/// An encoded media packet.
///
/// Packets either reference a padded [`SharedBuffer`] or borrow caller memory
/// (zero-copy). Borrowed payloads are copied into a padded buffer when the
/// packet is referenced with [`Packet::try_ref`].
#[derive(Clone)]
pub struct Packet<'a> {
    data: PacketData<'a>,
    /// Presentation timestamp in `time_base` units.
    pub pts: Option<i64>,
    /// Decode timestamp in `time_base` units.
    pub dts: Option<i64>,
    /// Duration in `time_base` units, 0 if unknown.
    pub duration: i64,
    /// Unit of the timestamps.
    pub time_base: TimeBase,
    /// Position in the input stream (bytes).
    pub pos: Option<u64>,
    /// Stream index this packet belongs to.
    pub stream_index: u32,
    /// Packet flags.
    pub flags: PacketFlags,
    /// Caller tag.
    pub opaque: Option<Opaque>,
    side_data: SideDataSet<PacketSideDataType>,
}

impl Default for Packet<'_> {
    fn default() -> Self {
        Self::with_data(PacketData::Empty)
    }
}

fn padded_copy(data: &[u8]) -> Result<SharedBuffer> {
    let mut vec = try_alloc_zeroed(data.len() + INPUT_BUFFER_PADDING_SIZE)?;
    vec[..data.len()].copy_from_slice(data);
    Ok(SharedBuffer::from_vec(vec))
}

impl<'a> Packet<'a> {
    fn with_data(data: PacketData<'a>) -> Self {
        Self {
            data,
            pts: None,
            dts: None,
            duration: 0,
            time_base: TimeBase::UNKNOWN,
            pos: None,
            stream_index: 0,
            flags: PacketFlags::empty(),
            opaque: None,
            side_data: SideDataSet::new(),
        }
    }

    /// Create an empty packet.
    ///
    /// Sent to a decoder, an empty packet signals end of stream.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Allocate a zeroed packet of `size` bytes plus padding.
    pub fn alloc(size: usize) -> Result<Packet<'static>> {
        let buf = SharedBuffer::alloc(size + INPUT_BUFFER_PADDING_SIZE)?;
        Ok(Packet::with_data(PacketData::Shared { buf, offset: 0, len: size }))
    }

    /// Create a packet holding a padded copy of `data`.
    pub fn copy_from_slice(data: &[u8]) -> Result<Packet<'static>> {
        Ok(Packet::with_data(PacketData::Shared {
            buf: padded_copy(data)?,
            offset: 0,
            len: data.len(),
        }))
    }

    /// Create a packet from several byte runs laid end to end.
    pub fn from_segments(segments: &[&[u8]]) -> Result<Packet<'static>> {
        let len: usize = segments.iter().map(|s| s.len()).sum();
        let mut packet = Packet::alloc(len)?;
        if let Some(out) = packet.data_mut() {
            let mut at = 0;
            for segment in segments {
                out[at..at + segment.len()].copy_from_slice(segment);
                at += segment.len();
            }
        }
        Ok(packet)
    }

    /// Take ownership of a vector, appending padding.
    pub fn from_vec(mut data: Vec<u8>) -> Result<Packet<'static>> {
        let len = data.len();
        data.try_reserve_exact(INPUT_BUFFER_PADDING_SIZE)
            .map_err(|_| Error::OutOfMemory { requested: len + INPUT_BUFFER_PADDING_SIZE })?;
        data.resize(len + INPUT_BUFFER_PADDING_SIZE, 0);
        Ok(Packet::with_data(PacketData::Shared {
            buf: SharedBuffer::from_vec(data),
            offset: 0,
            len,
        }))
    }

    /// Wrap the first `len` bytes of a caller buffer.
    ///
    /// The buffer must extend at least [`INPUT_BUFFER_PADDING_SIZE`] zero bytes
    /// past `len`.
    pub fn from_buffer(buf: SharedBuffer, len: usize) -> Result<Packet<'static>> {
        let padding = buf.data().get(len..len + INPUT_BUFFER_PADDING_SIZE).ok_or_else(|| {
            Error::invalid_param(format!(
                "buffer of {} bytes cannot hold {len} bytes plus padding",
                buf.len()
            ))
        })?;
        if padding.iter().any(|&b| b != 0) {
            return Err(Error::invalid_param("packet padding is not zeroed"));
        }
        Ok(Packet::with_data(PacketData::Shared { buf, offset: 0, len }))
    }

    /// Create a new packet referencing external data.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::with_data(PacketData::Borrowed(data))
    }

    /// Get the packet data.
    pub fn data(&self) -> &[u8] {
        match &self.data {
            PacketData::Empty => &[],
            PacketData::Borrowed(data) => data,
            PacketData::Shared { buf, offset, len } => &buf.data()[*offset..*offset + *len],
        }
    }

    /// Mutable payload, if the packet exclusively owns its buffer.
    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.data {
            PacketData::Shared { buf, offset, len } => {
                let range = *offset..*offset + *len;
                buf.data_mut().map(|d| &mut d[range])
            }
            _ => None,
        }
    }

    /// The zero bytes following the payload, for reference-counted packets.
    pub fn padding(&self) -> Option<&[u8]> {
        match &self.data {
            PacketData::Shared { buf, offset, len } => {
                let end = offset + len;
                buf.data().get(end..end + INPUT_BUFFER_PADDING_SIZE)
            }
            _ => None,
        }
    }

    /// Backing buffer, if reference counted.
    pub fn buffer(&self) -> Option<&SharedBuffer> {
        match &self.data {
            PacketData::Shared { buf, .. } => Some(buf),
            _ => None,
        }
    }

    /// Get the size of the packet data.
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Check if this packet is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the packet references a buffer or borrowed bytes.
    pub fn is_referenced(&self) -> bool {
        !matches!(self.data, PacketData::Empty)
    }

    /// Check if this is a keyframe packet.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(PacketFlags::KEYFRAME)
    }

    /// Set the keyframe flag.
    pub fn set_keyframe(&mut self, keyframe: bool) {
        self.flags.set(PacketFlags::KEYFRAME, keyframe);
    }

    /// A new packet referencing the same payload and carrying the same props.
    pub fn try_ref(&self) -> Result<Packet<'static>> {
        let data = match &self.data {
            PacketData::Empty => PacketData::Empty,
            PacketData::Borrowed(bytes) => PacketData::Shared {
                buf: padded_copy(bytes)?,
                offset: 0,
                len: bytes.len(),
            },
            PacketData::Shared { buf, offset, len } => PacketData::Shared {
                buf: buf.clone(),
                offset: *offset,
                len: *len,
            },
        };
        let mut dst = Packet::with_data(data);
        dst.copy_props(self);
        Ok(dst)
    }

    /// Drop the payload reference and reset all fields.
    pub fn unref(&mut self) {
        *self = Self::default();
    }

    /// Take the contents out, leaving this packet empty.
    pub fn move_ref(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Check whether the payload can be written in place.
    pub fn is_writable(&self) -> bool {
        self.buffer().map_or(false, SharedBuffer::is_writable)
    }

    /// Ensure the payload is exclusively owned, copying it if needed.
    pub fn make_writable(&mut self) -> Result<()> {
        if self.is_writable() {
            return Ok(());
        }
        let len = self.len();
        let buf = padded_copy(self.data())?;
        self.data = PacketData::Shared { buf, offset: 0, len };
        Ok(())
    }

    /// Copy every property except the payload from `src`.
    pub fn copy_props(&mut self, src: &Packet<'_>) {
        self.pts = src.pts;
        self.dts = src.dts;
        self.duration = src.duration;
        self.time_base = src.time_base;
        self.pos = src.pos;
        self.stream_index = src.stream_index;
        self.flags = src.flags;
        self.opaque = src.opaque.clone();
        self.side_data = src.side_data.clone();
    }

    /// Reduce the payload to `size` bytes, zeroing the new padding.
    pub fn shrink(&mut self, size: usize) -> Result<()> {
        if size >= self.len() {
            return Ok(());
        }
        self.make_writable()?;
        if let PacketData::Shared { buf, offset, len } = &mut self.data {
            let start = *offset + size;
            let end = (start + INPUT_BUFFER_PADDING_SIZE).min(buf.len());
            if let Some(data) = buf.data_mut() {
                data[start..end].fill(0);
            }
            *len = size;
        }
        Ok(())
    }

    /// Extend the payload by `extra` zero bytes, reallocating when needed.
    pub fn grow(&mut self, extra: usize) -> Result<()> {
        let new_len = self.len() + extra;
        if self.is_writable() {
            if let PacketData::Shared { buf, offset, len } = &mut self.data {
                let end = *offset + new_len + INPUT_BUFFER_PADDING_SIZE;
                if end <= buf.len() {
                    if let Some(data) = buf.data_mut() {
                        data[*offset + *len..end].fill(0);
                    }
                    *len = new_len;
                    return Ok(());
                }
            }
        }
        let mut vec = try_alloc_zeroed(new_len + INPUT_BUFFER_PADDING_SIZE)?;
        let old_len = self.len();
        vec[..old_len].copy_from_slice(self.data());
        self.data = PacketData::Shared {
            buf: SharedBuffer::from_vec(vec),
            offset: 0,
            len: new_len,
        };
        Ok(())
    }

    /// Convert timestamps and duration to `target`.
    ///
    /// A packet with an unknown time base only adopts `target`.
    pub fn rescale_ts(&mut self, target: TimeBase) {
        if self.time_base.is_known() && target.is_known() {
            self.pts = self.time_base.rescale_ts(self.pts, target);
            self.dts = self.time_base.rescale_ts(self.dts, target);
            self.duration = self.time_base.rescale(self.duration, target).unwrap_or(0);
        }
        self.time_base = target;
    }

    /// Side data attached to this packet.
    pub fn side_data(&self) -> &SideDataSet<PacketSideDataType> {
        &self.side_data
    }

    /// Mutable side data.
    pub fn side_data_mut(&mut self) -> &mut SideDataSet<PacketSideDataType> {
        &mut self.side_data
    }

    /// Create a new packet with the specified timestamps.
    pub fn with_timestamps(mut self, pts: Option<i64>, dts: Option<i64>) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    /// Create a new packet with the specified time base.
    pub fn with_time_base(mut self, time_base: TimeBase) -> Self {
        self.time_base = time_base;
        self
    }

    /// Create a new packet with the specified stream index.
    pub fn with_stream_index(mut self, index: u32) -> Self {
        self.stream_index = index;
        self
    }

    /// Create a new packet with the specified flags.
    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("size", &self.len())
            .field("pts", &self.pts)
            .field("dts", &self.dts)
            .field("duration", &self.duration)
            .field("stream_index", &self.stream_index)
            .field("flags", &self.flags)
            .field("side_data", &self.side_data.len())
            .finish()
    }
}
