//! Audio codec implementations.

pub mod pcm;

pub use pcm::{PcmDecoder, PcmEncoder, PcmWire};
