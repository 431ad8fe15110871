//! # Transcode Core
//!
//! Core media units for the Transcode coder engine.
//!
//! This crate provides the building blocks every coder works with:
//! - Error handling types
//! - Reference-counted buffers and buffer pools
//! - Packets (coded data) and frames (raw pictures and audio)
//! - Typed side data attached to both
//! - Pixel/sample formats, rationals and time bases

pub mod buffer;
pub mod error;
pub mod format;
pub mod frame;
pub mod metrics;
pub mod opaque;
pub mod packet;
pub mod pixel;
pub mod pool;
pub mod rational;
pub mod sample;
pub mod side_data;
pub mod timestamp;

#[cfg(feature = "metrics")]
#[doc(hidden)]
pub use ::metrics as __metrics;

pub use buffer::{SharedBuffer, INPUT_BUFFER_PADDING_SIZE};
pub use error::{CodecError, CodecResult, Error, ErrorKind, Result};
pub use format::{CodecId, MediaType};
pub use frame::{CropFlags, CropRect, Frame, FrameFlags, FrameFormat, Plane, FRAME_ALIGN};
pub use opaque::Opaque;
pub use packet::{Packet, PacketFlags};
pub use pixel::{ColorInfo, ColorPrimaries, ColorRange, ColorSpace, ColorTransfer, PixelFormat};
pub use pool::{BufferPool, DefaultAllocator, FrameAllocator, FramePool};
pub use rational::Rational;
pub use sample::{ChannelLayout, SampleFormat};
pub use side_data::{
    AddPolicy, FrameSideDataType, PacketSideDataType, SideData, SideDataPayload, SideDataProps,
    SideDataSet, SideDataValue,
};
pub use timestamp::TimeBase;
