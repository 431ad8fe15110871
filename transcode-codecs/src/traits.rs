//! Common codec traits.
//!
//! This module defines the algorithm side of a coder:
//!
//! - [`Decoder`] / [`Encoder`] - the coding algorithms a [`Coder`](crate::Coder) drives
//! - [`Algorithm`] - a boxed decoder or encoder
//! - [`MediaUnit`] - a packet or a frame flowing through a coder
//!
//! Algorithms never see the caller's send/receive calls. The state machine
//! feeds them owned units one at a time (or in batches when frame threading
//! is active) and they push results into the [`CodingContext`].

use crate::config::{CoderConfig, Negotiated};
use crate::context::CodingContext;
use crate::info::{CodecInfo, Direction};
use transcode_core::{Error, Frame, MediaType, Packet, Result};

/// Common trait for decoding algorithms.
pub trait Decoder: Send {
    /// Get codec information.
    fn info(&self) -> &'static CodecInfo;

    /// Allocate private state for `config` and record negotiated facts.
    fn open(&mut self, config: &CoderConfig, negotiated: &mut Negotiated) -> Result<()>;

    /// Decode one packet, emitting zero or more frames.
    fn decode(&mut self, packet: Packet<'static>, ctx: &mut CodingContext) -> Result<()>;

    /// Decode several packets at once; used when frame threading is active.
    fn decode_batch(
        &mut self,
        packets: Vec<Packet<'static>>,
        ctx: &mut CodingContext,
    ) -> Result<()> {
        for_each_in_batch(packets, |packet| self.decode(packet, ctx))
    }

    /// Emit everything still buffered; called once at end of stream.
    fn drain(&mut self, _ctx: &mut CodingContext) -> Result<()> {
        Ok(())
    }

    /// Discard all history, keeping the negotiated parameters.
    fn flush(&mut self);

    /// Release private state. A later [`flush`](Decoder::flush) must make the
    /// algorithm usable again.
    fn close(&mut self) {
        self.flush();
    }
}

/// Common trait for encoding algorithms.
pub trait Encoder: Send {
    /// Get codec information.
    fn info(&self) -> &'static CodecInfo;

    /// Allocate private state for `config` and record negotiated facts.
    fn open(&mut self, config: &CoderConfig, negotiated: &mut Negotiated) -> Result<()>;

    /// Encode one frame, emitting zero or more packets.
    fn encode(&mut self, frame: Frame<'static>, ctx: &mut CodingContext) -> Result<()>;

    /// Encode several frames at once; used when frame threading is active.
    fn encode_batch(&mut self, frames: Vec<Frame<'static>>, ctx: &mut CodingContext) -> Result<()> {
        for_each_in_batch(frames, |frame| self.encode(frame, ctx))
    }

    /// Emit everything still buffered; called once at end of stream.
    fn drain(&mut self, _ctx: &mut CodingContext) -> Result<()> {
        Ok(())
    }

    /// Discard all history, keeping the negotiated parameters.
    fn flush(&mut self);

    /// Release private state. A later [`flush`](Encoder::flush) must make the
    /// algorithm usable again.
    fn close(&mut self) {
        self.flush();
    }
}

/// Process every unit of a batch one at a time.
///
/// A recoverable error does not stop the batch; the first one is returned
/// once the remaining units have been processed. A fatal error stops at once.
pub fn for_each_in_batch<T>(
    units: Vec<T>,
    mut step: impl FnMut(T) -> Result<()>,
) -> Result<()> {
    let mut first_error = None;
    for unit in units {
        if let Err(e) = step(unit) {
            if !e.is_recoverable() {
                return Err(e);
            }
            match first_error {
                None => first_error = Some(e),
                Some(_) => tracing::warn!(error = %e, "further error in batch"),
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// A packet or a frame.
#[derive(Debug, Clone)]
pub enum MediaUnit {
    /// Coded data.
    Packet(Packet<'static>),
    /// Raw picture or audio.
    Frame(Frame<'static>),
}

impl MediaUnit {
    /// Presentation timestamp.
    pub fn pts(&self) -> Option<i64> {
        match self {
            Self::Packet(p) => p.pts,
            Self::Frame(f) => f.pts,
        }
    }

    /// The packet, if this is one.
    pub fn into_packet(self) -> Option<Packet<'static>> {
        match self {
            Self::Packet(p) => Some(p),
            Self::Frame(_) => None,
        }
    }

    /// The frame, if this is one.
    pub fn into_frame(self) -> Option<Frame<'static>> {
        match self {
            Self::Frame(f) => Some(f),
            Self::Packet(_) => None,
        }
    }

    /// Whether a coder of `direction` accepts this unit as input.
    pub fn is_input_for(&self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Self::Packet(_), Direction::Decode) | (Self::Frame(_), Direction::Encode)
        )
    }
}

impl From<Packet<'static>> for MediaUnit {
    fn from(packet: Packet<'static>) -> Self {
        Self::Packet(packet)
    }
}

impl From<Frame<'static>> for MediaUnit {
    fn from(frame: Frame<'static>) -> Self {
        Self::Frame(frame)
    }
}

/// A boxed decoding or encoding algorithm.
pub enum Algorithm {
    /// Packets in, frames out.
    Decoder(Box<dyn Decoder>),
    /// Frames in, packets out.
    Encoder(Box<dyn Encoder>),
}

fn wrong_direction(direction: Direction) -> Error {
    Error::invalid_state(format!("unit does not match {direction} input"))
}

impl Algorithm {
    /// Get codec information.
    pub fn info(&self) -> &'static CodecInfo {
        match self {
            Self::Decoder(d) => d.info(),
            Self::Encoder(e) => e.info(),
        }
    }

    /// Decoder or encoder.
    pub fn direction(&self) -> Direction {
        match self {
            Self::Decoder(_) => Direction::Decode,
            Self::Encoder(_) => Direction::Encode,
        }
    }

    /// Media type handled.
    pub fn media_type(&self) -> MediaType {
        self.info().media_type()
    }

    pub(crate) fn open(&mut self, config: &CoderConfig, negotiated: &mut Negotiated) -> Result<()> {
        match self {
            Self::Decoder(d) => d.open(config, negotiated),
            Self::Encoder(e) => e.open(config, negotiated),
        }
    }

    pub(crate) fn process(&mut self, unit: MediaUnit, ctx: &mut CodingContext) -> Result<()> {
        match (self, unit) {
            (Self::Decoder(d), MediaUnit::Packet(p)) => d.decode(p, ctx),
            (Self::Encoder(e), MediaUnit::Frame(f)) => e.encode(f, ctx),
            (alg, _) => Err(wrong_direction(alg.direction())),
        }
    }

    pub(crate) fn process_batch(
        &mut self,
        units: Vec<MediaUnit>,
        ctx: &mut CodingContext,
    ) -> Result<()> {
        let direction = self.direction();
        match self {
            Self::Decoder(d) => {
                let packets = units
                    .into_iter()
                    .map(|u| u.into_packet().ok_or_else(|| wrong_direction(direction)))
                    .collect::<Result<Vec<_>>>()?;
                d.decode_batch(packets, ctx)
            }
            Self::Encoder(e) => {
                let frames = units
                    .into_iter()
                    .map(|u| u.into_frame().ok_or_else(|| wrong_direction(direction)))
                    .collect::<Result<Vec<_>>>()?;
                e.encode_batch(frames, ctx)
            }
        }
    }

    pub(crate) fn drain(&mut self, ctx: &mut CodingContext) -> Result<()> {
        match self {
            Self::Decoder(d) => d.drain(ctx),
            Self::Encoder(e) => e.drain(ctx),
        }
    }

    pub(crate) fn flush(&mut self) {
        match self {
            Self::Decoder(d) => d.flush(),
            Self::Encoder(e) => e.flush(),
        }
    }

    pub(crate) fn close(&mut self) {
        match self {
            Self::Decoder(d) => d.close(),
            Self::Encoder(e) => e.close(),
        }
    }
}

impl std::fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Algorithm({})", self.info())
    }
}
