//! # Transcode Codecs
//!
//! The coding side of the Transcode library: coders, the send/receive state
//! machine that drives them, and the algorithms they wrap.
//!
//! ## Coders
//!
//! A [`Coder`] wraps one decoding or encoding [`Algorithm`] and moves through
//! a fixed lifecycle (see [`CoderState`]). Callers configure it through
//! [`CoderConfig`], [`open`](Coder::open) it, then pump data:
//!
//! ```
//! use transcode_codecs::{Coder, CoderConfig, Received, SendStatus};
//! use transcode_core::{CodecId, Packet, PixelFormat};
//!
//! let mut decoder = Coder::decoder(CodecId::RawVideo)?;
//! decoder.set_config(CoderConfig::video(4, 2, PixelFormat::Gray8))?;
//! decoder.open()?;
//!
//! let packet = Packet::copy_from_slice(&[0u8; 8])?;
//! assert_eq!(decoder.send_packet(&packet)?, SendStatus::Accepted);
//! decoder.send_eos()?;
//! while let Received::Ready(frame) = decoder.receive_frame()? {
//!     assert_eq!(frame.width, 4);
//! }
//! # Ok::<(), transcode_core::Error>(())
//! ```
//!
//! Flow control is part of the result, not an error: a full coder answers
//! [`SendStatus::Busy`] and is guaranteed to have output ready.
//!
//! ## Algorithms
//!
//! - [`video::raw`] - uncompressed video, with optional reordering and a B-frame GOP planner
//! - [`audio::pcm`] - PCM in u8, s16le, s16be and f32le
//!
//! Custom algorithms implement [`Decoder`] or [`Encoder`] and are either
//! wrapped directly ([`Coder::from_decoder`]) or added to a [`CodecRegistry`].
//!
//! ## Threading
//!
//! Algorithms that declare [`Capabilities::FRAME_THREADS`] or
//! [`Capabilities::SLICE_THREADS`] run their jobs on an [`Executor`]; the
//! default is a [`RayonExecutor`] sized from the configured thread count.

pub mod audio;
pub mod coder;
pub mod config;
pub mod context;
pub mod info;
pub mod parallel;
pub mod registry;
pub mod state;
pub mod traits;
pub mod video;

pub use coder::{Coder, CoderState, Input};
pub use config::{CoderConfig, CoderFlags, Negotiated, ThreadType, DEFAULT_MAX_BUFFERED_UNITS};
pub use context::CodingContext;
pub use info::{Capabilities, CodecInfo, Direction};
pub use parallel::{split_rows, Executor, Job, RayonExecutor, SerialExecutor};
pub use registry::CodecRegistry;
pub use state::{Received, SendStatus};
pub use traits::{Algorithm, Decoder, Encoder, MediaUnit};
