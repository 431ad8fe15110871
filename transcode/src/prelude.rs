//! Prelude module for convenient imports.
//!
//! ```rust
//! use transcode::prelude::*;
//! ```

// Core error types
pub use crate::{Error, ErrorKind, Result};

// Media units
pub use crate::{Frame, Packet, PacketFlags, SharedBuffer};

// Formats and timing
pub use crate::{ChannelLayout, CodecId, MediaType, PixelFormat, Rational, SampleFormat, TimeBase};

// Coders
pub use crate::{Coder, CoderConfig, CoderFlags, Direction, Received, SendStatus};

// High-level API
pub use crate::{TranscodeStats, Transcoder};
