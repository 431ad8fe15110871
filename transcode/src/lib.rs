//! # Transcode
//!
//! A decoupled send/receive media coding engine.
//!
//! Coders accept input units and hand back output units through separate
//! calls, so one unit in never has to mean one unit out. Back-pressure,
//! end-of-stream draining and algorithm faults are reported as values the
//! caller can act on.
//!
//! ## Quick Start
//!
//! ```rust
//! use transcode::prelude::*;
//!
//! fn main() -> transcode::Result<()> {
//!     let config = CoderConfig::video(4, 2, PixelFormat::Gray8);
//!     let mut decoder = Coder::decoder(CodecId::RawVideo)?;
//!     decoder.set_config(config.clone())?;
//!     decoder.open()?;
//!     let mut encoder = Coder::encoder(CodecId::RawVideo)?;
//!     encoder.set_config(config)?;
//!     encoder.open()?;
//!
//!     let mut transcoder = Transcoder::new(decoder, encoder)?;
//!     let mut out = Vec::new();
//!     let mut sink = |packet: Packet<'static>| -> Result<()> {
//!         out.push(packet);
//!         Ok(())
//!     };
//!     let input = Packet::copy_from_slice(&[7; 8])?.with_timestamps(Some(0), None);
//!     transcoder.push(&input, &mut sink)?;
//!     let stats = transcoder.finish(&mut sink)?;
//!     assert_eq!(stats.packets_out, 1);
//!     assert_eq!(out[0].data(), &[7; 8]);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several crates:
//! - `transcode-core`: buffers, packets, frames, side data and errors
//! - `transcode-codecs`: the coder lifecycle, state machine, registry and
//!   reference algorithms
//!
//! This crate re-exports the most commonly used types and provides the
//! [`Transcoder`] pump for the common decode-then-encode case.

pub mod prelude;
mod transcoder;

// Re-export core types
pub use transcode_core::{
    AddPolicy, BufferPool, ChannelLayout, CodecError, CodecId, ColorInfo, CropFlags, CropRect,
    DefaultAllocator, Error, ErrorKind, Frame, FrameAllocator, FrameFlags, FramePool,
    FrameSideDataType, MediaType, Packet, PacketFlags, PacketSideDataType, PixelFormat, Rational,
    Result, SampleFormat, SharedBuffer, SideDataValue, TimeBase, FRAME_ALIGN,
    INPUT_BUFFER_PADDING_SIZE,
};

// Re-export codec types
pub use transcode_codecs::{
    Capabilities, CodecInfo, CodecRegistry, Coder, CoderConfig, CoderFlags, CoderState, Decoder,
    Direction, Encoder, Executor, Input, Negotiated, RayonExecutor, Received, SendStatus,
    SerialExecutor, ThreadType,
};

// High-level API
pub use transcoder::{FrameHook, ProgressCallback, TranscodeStats, Transcoder};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string.
pub fn version() -> &'static str {
    VERSION
}
