//! Video codec implementations.

pub mod raw;

pub use raw::{PictureType, RawVideoDecoder, RawVideoEncoder};
