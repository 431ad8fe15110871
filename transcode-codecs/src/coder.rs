//! The coder: one algorithm, its configuration and its send/receive state.
//!
//! ```text
//! Unconfigured -> Configured -> Opened -> Draining -> Closed
//!                                  ^                    |
//!                                  +------ reset -------+
//! ```
//!
//! Configuration is only mutable before [`Coder::open`]. Once open, data
//! moves through [`Coder::send_input`] and [`Coder::receive_output`] and the
//! caller pumps both sides until output reports
//! [`Received::Exhausted`].

use crate::config::{CoderConfig, CoderFlags, Negotiated, ThreadType};
use crate::context::CodingContext;
use crate::info::{Capabilities, CodecInfo, Direction};
use crate::parallel::{Executor, RayonExecutor, SerialExecutor};
use crate::registry::CodecRegistry;
use crate::state::{CodingStateMachine, Received, SendStatus};
use crate::traits::{Algorithm, Decoder, Encoder, MediaUnit};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use transcode_core::side_data::{SideDataKind, SideDataProps};
use transcode_core::{
    AddPolicy, CodecId, DefaultAllocator, Error, ErrorKind, Frame, FrameAllocator, FrameFormat,
    FrameSideDataType, MediaType, Packet, Result, SideDataPayload, SideDataSet,
};

/// Lifecycle state of a [`Coder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoderState {
    /// Defaults only.
    Unconfigured,
    /// Configuration edited, not yet open.
    Configured,
    /// Accepting input.
    Opened,
    /// End of stream signalled; only output moves.
    Draining,
    /// Released; reset to reuse.
    Closed,
}

/// What can be handed to [`Coder::send_input`].
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    /// Compressed input for a decoder.
    Packet(&'a Packet<'a>),
    /// Raw input for an encoder.
    Frame(&'a Frame<'a>),
    /// No more input will follow.
    EndOfStream,
}

/// A decoder or encoder instance.
pub struct Coder {
    info: &'static CodecInfo,
    state: CoderState,
    config: CoderConfig,
    negotiated: Negotiated,
    allocator: Option<Arc<dyn FrameAllocator>>,
    executor: Option<Arc<dyn Executor>>,
    global_side_data: SideDataSet<FrameSideDataType>,
    algorithm: Algorithm,
    machine: Option<CodingStateMachine>,
    short_frame_sent: bool,
}

impl Coder {
    fn with_algorithm(algorithm: Algorithm) -> Self {
        Self {
            info: algorithm.info(),
            state: CoderState::Unconfigured,
            config: CoderConfig::default(),
            negotiated: Negotiated::default(),
            allocator: None,
            executor: None,
            global_side_data: SideDataSet::new(),
            algorithm,
            machine: None,
            short_frame_sent: false,
        }
    }

    /// Create a decoder from the global registry.
    pub fn decoder(id: CodecId) -> Result<Self> {
        CodecRegistry::global()
            .create(id, Direction::Decode)
            .map(Self::with_algorithm)
    }

    /// Create an encoder from the global registry.
    pub fn encoder(id: CodecId) -> Result<Self> {
        CodecRegistry::global()
            .create(id, Direction::Encode)
            .map(Self::with_algorithm)
    }

    /// Create a coder by algorithm name from the global registry.
    pub fn by_name(name: &str, direction: Direction) -> Result<Self> {
        CodecRegistry::global()
            .create_by_name(name, direction)
            .map(Self::with_algorithm)
    }

    /// Wrap a custom decoding algorithm.
    pub fn from_decoder(decoder: Box<dyn Decoder>) -> Self {
        Self::with_algorithm(Algorithm::Decoder(decoder))
    }

    /// Wrap a custom encoding algorithm.
    pub fn from_encoder(encoder: Box<dyn Encoder>) -> Self {
        Self::with_algorithm(Algorithm::Encoder(encoder))
    }

    /// Algorithm description.
    pub fn info(&self) -> &'static CodecInfo {
        self.info
    }

    /// Decoder or encoder.
    pub fn direction(&self) -> Direction {
        self.info.direction
    }

    /// Media type handled.
    pub fn media_type(&self) -> MediaType {
        self.info.media_type()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CoderState {
        self.state
    }

    /// Check whether the coder has been opened and not closed.
    pub fn is_open(&self) -> bool {
        matches!(self.state, CoderState::Opened | CoderState::Draining)
    }

    /// Current configuration.
    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    /// Facts settled at open; defaults before.
    pub fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    /// Upper bound on units held inside the coder at once.
    pub fn max_buffering_depth(&self) -> usize {
        self.config.max_buffered_units.max(1) + self.negotiated.delay
    }

    fn ensure_configurable(&self) -> Result<()> {
        match self.state {
            CoderState::Unconfigured | CoderState::Configured => Ok(()),
            state => Err(Error::invalid_state(format!(
                "configuration is read-only in state {state:?}"
            ))),
        }
    }

    /// Edit the configuration; rejected once the coder is open.
    ///
    /// The edit applies to a copy which replaces the configuration as a whole.
    pub fn configure(&mut self, edit: impl FnOnce(&mut CoderConfig)) -> Result<()> {
        self.ensure_configurable()?;
        let mut next = self.config.clone();
        edit(&mut next);
        next.max_buffered_units = next.max_buffered_units.max(1);
        self.config = next;
        self.state = CoderState::Configured;
        Ok(())
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: CoderConfig) -> Result<()> {
        self.configure(|c| *c = config)
    }

    /// Set one field from its textual option name; nothing changes on error.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_configurable()?;
        let mut next = self.config.clone();
        next.set_option(key, value)?;
        self.config = next;
        self.state = CoderState::Configured;
        Ok(())
    }

    /// Supply the allocator used for output buffers.
    pub fn set_allocator(&mut self, allocator: Arc<dyn FrameAllocator>) -> Result<()> {
        self.ensure_configurable()?;
        self.allocator = Some(allocator);
        Ok(())
    }

    /// Supply the executor used for slice and frame jobs.
    pub fn set_executor(&mut self, executor: Arc<dyn Executor>) -> Result<()> {
        self.ensure_configurable()?;
        self.executor = Some(executor);
        Ok(())
    }

    /// Attach stream-global side data; decoders copy it onto every frame
    /// that lacks an entry of the same type.
    pub fn add_global_side_data(
        &mut self,
        kind: FrameSideDataType,
        payload: impl Into<SideDataPayload>,
        policy: AddPolicy,
    ) -> Result<()> {
        self.ensure_configurable()?;
        if !kind.props().contains(SideDataProps::GLOBAL) {
            return Err(Error::invalid_param(format!(
                "side data '{}' is not stream-global",
                kind.name()
            )));
        }
        self.global_side_data.add(kind, payload, policy)?;
        Ok(())
    }

    /// Stream-global side data.
    pub fn global_side_data(&self) -> &SideDataSet<FrameSideDataType> {
        &self.global_side_data
    }

    fn check_formats(&self) -> Result<()> {
        let media_type = self.media_type();
        self.config.validate_for(media_type)?;
        let info = self.info;
        match media_type {
            MediaType::Video => {
                if let Some(fmt) = self.config.pixel_format {
                    if !info.supports_pixel_format(fmt) {
                        return Err(Error::negotiation(format!(
                            "{} does not support pixel format {}",
                            info.name,
                            fmt.name()
                        )));
                    }
                }
            }
            MediaType::Audio => {
                if let Some(fmt) = self.config.sample_format {
                    if !info.supports_sample_format(fmt) {
                        return Err(Error::negotiation(format!(
                            "{} does not support sample format {}",
                            info.name,
                            fmt.name()
                        )));
                    }
                }
                if !info.supports_sample_rate(self.config.sample_rate) {
                    return Err(Error::negotiation(format!(
                        "{} does not support sample rate {}",
                        info.name, self.config.sample_rate
                    )));
                }
            }
        }
        Ok(())
    }

    fn negotiate_threads(&self) -> (ThreadType, usize) {
        let threads = self.config.effective_threads();
        if threads <= 1 {
            return (ThreadType::empty(), 1);
        }
        let wanted = self.config.thread_type;
        if self.info.has(Capabilities::FRAME_THREADS)
            && wanted.contains(ThreadType::FRAME)
            && !self.config.flags.contains(CoderFlags::LOW_DELAY)
        {
            (ThreadType::FRAME, threads)
        } else if self.info.has(Capabilities::SLICE_THREADS) && wanted.contains(ThreadType::SLICE) {
            (ThreadType::SLICE, threads)
        } else {
            (ThreadType::empty(), 1)
        }
    }

    /// Validate the configuration against the algorithm and allocate its
    /// state. On failure the coder is left configured.
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            CoderState::Unconfigured | CoderState::Configured => {}
            CoderState::Closed => {
                return Err(Error::invalid_state("coder is closed; reset it instead"))
            }
            _ => return Err(Error::invalid_state("coder is already open")),
        }
        self.state = CoderState::Configured;
        self.check_formats()?;

        let (thread_type, thread_count) = self.negotiate_threads();
        let mut negotiated = Negotiated {
            thread_type,
            thread_count,
            reorder_depth: self.config.reorder_depth,
            pixel_format: self.config.pixel_format,
            sample_format: self.config.sample_format,
            ..Negotiated::default()
        };
        if let Err(e) = self.algorithm.open(&self.config, &mut negotiated) {
            debug!(codec = self.info.name, error = %e, "open failed");
            return Err(match e.kind() {
                ErrorKind::NegotiationFailed | ErrorKind::OutOfMemory => e,
                _ => Error::negotiation(e.to_string()),
            });
        }
        if thread_type == ThreadType::FRAME {
            negotiated.delay += thread_count - 1;
        }
        let machine = match self.start_machine(&negotiated) {
            Ok(machine) => machine,
            Err(e) => {
                self.algorithm.close();
                return Err(e);
            }
        };
        debug!(
            codec = self.info.name,
            direction = %self.direction(),
            delay = negotiated.delay,
            threads = thread_count,
            thread_type = ?thread_type,
            capacity = self.config.max_buffered_units.max(1),
            "coder opened"
        );
        self.machine = Some(machine);
        self.negotiated = negotiated;
        self.short_frame_sent = false;
        self.state = CoderState::Opened;
        Ok(())
    }

    /// Build the send/receive machinery for negotiated parameters, taking
    /// fresh handles on the executor and allocator.
    fn start_machine(&self, negotiated: &Negotiated) -> Result<CodingStateMachine> {
        let thread_count = negotiated.thread_count;
        let executor: Arc<dyn Executor> = match &self.executor {
            Some(executor) => Arc::clone(executor),
            None if thread_count > 1 => Arc::new(RayonExecutor::new(thread_count)?),
            None => Arc::new(SerialExecutor),
        };
        let allocator: Arc<dyn FrameAllocator> = match &self.allocator {
            Some(allocator) => Arc::clone(allocator),
            None => Arc::new(DefaultAllocator),
        };
        let batch = if negotiated.thread_type == ThreadType::FRAME {
            thread_count
        } else {
            1
        };
        let capacity = self.config.max_buffered_units.max(1);
        let ctx = CodingContext::new(
            self.direction(),
            allocator,
            executor,
            self.config.clone(),
            negotiated.clone(),
            self.global_side_data.clone(),
        );
        Ok(CodingStateMachine::new(ctx, capacity, batch, self.info.name))
    }

    fn check_input(&self, input: &Input<'_>) -> Result<bool> {
        let expected = match input {
            Input::EndOfStream => return Ok(true),
            Input::Packet(_) => Direction::Decode,
            Input::Frame(_) => Direction::Encode,
        };
        if expected != self.direction() {
            return Err(Error::invalid_state(format!(
                "{} cannot take {} input",
                self.info.name,
                if expected == Direction::Decode { "compressed" } else { "raw" }
            )));
        }
        match input {
            Input::Packet(packet) => {
                if packet.is_empty() {
                    if packet.is_referenced() {
                        return Err(Error::invalid_param("empty packet with a payload buffer"));
                    }
                    return Ok(true);
                }
            }
            Input::Frame(frame) => {
                let matches = match frame.format {
                    FrameFormat::Video(_) => self.media_type() == MediaType::Video,
                    FrameFormat::Audio(_) => self.media_type() == MediaType::Audio,
                    FrameFormat::Unset => false,
                };
                if !matches {
                    return Err(Error::invalid_param(format!(
                        "frame is not {} input",
                        self.media_type()
                    )));
                }
                if !frame.has_buffers() {
                    return Err(Error::invalid_param("frame has no data"));
                }
                if let FrameFormat::Audio(_) = frame.format {
                    self.check_frame_size(frame.nb_samples)?;
                }
            }
            Input::EndOfStream => {}
        }
        Ok(false)
    }

    /// Encoders with a fixed frame size take exactly that many samples per
    /// frame. A shorter frame is allowed once, as the last one, when the
    /// algorithm declares [`Capabilities::SMALL_LAST_FRAME`].
    fn check_frame_size(&self, nb_samples: usize) -> Result<()> {
        let frame_size = self.negotiated.frame_size;
        if frame_size == 0 || self.info.has(Capabilities::VARIABLE_FRAME_SIZE) {
            return Ok(());
        }
        if self.short_frame_sent {
            return Err(Error::invalid_param(format!(
                "{}: no frame may follow a short last frame",
                self.info.name
            )));
        }
        if nb_samples == frame_size
            || (nb_samples < frame_size && self.info.has(Capabilities::SMALL_LAST_FRAME))
        {
            return Ok(());
        }
        Err(Error::invalid_param(format!(
            "{}: frame has {nb_samples} samples, expected {frame_size}",
            self.info.name
        )))
    }

    /// Offer input, or signal end of stream.
    ///
    /// The coder takes its own reference to the unit; the caller's handle
    /// stays valid whatever the outcome. On `Busy` nothing was taken.
    pub fn send_input(&mut self, input: Input<'_>) -> Result<SendStatus> {
        match self.state {
            CoderState::Unconfigured | CoderState::Configured => {
                return Err(Error::invalid_state("coder is not open"))
            }
            CoderState::Closed => return Ok(SendStatus::StreamEnded),
            CoderState::Opened | CoderState::Draining => {}
        }
        let end_of_stream = self.check_input(&input)?;
        let machine = self
            .machine
            .as_mut()
            .ok_or_else(|| Error::invalid_state("coder is not open"))?;

        if end_of_stream {
            let status = machine.send_eos(&mut self.algorithm)?;
            if status == SendStatus::Accepted {
                debug!(codec = self.info.name, "draining");
                self.state = CoderState::Draining;
            }
            return Ok(status);
        }
        if let Some(status) = machine.admission()? {
            return Ok(status);
        }
        let unit = match input {
            Input::Packet(packet) => MediaUnit::Packet(packet.try_ref()?),
            Input::Frame(frame) => {
                let frame_size = self.negotiated.frame_size;
                if frame_size > 0 && frame.nb_samples < frame_size {
                    if let FrameFormat::Audio(_) = frame.format {
                        self.short_frame_sent = true;
                    }
                }
                MediaUnit::Frame(frame.try_ref()?)
            }
            Input::EndOfStream => return Ok(SendStatus::StreamEnded),
        };
        Ok(machine.push(unit, &mut self.algorithm))
    }

    /// Offer a compressed unit to a decoder. A packet with no payload and no
    /// buffer signals end of stream.
    pub fn send_packet(&mut self, packet: &Packet<'_>) -> Result<SendStatus> {
        self.send_input(Input::Packet(packet))
    }

    /// Offer a raw unit to an encoder.
    pub fn send_frame(&mut self, frame: &Frame<'_>) -> Result<SendStatus> {
        self.send_input(Input::Frame(frame))
    }

    /// Signal end of stream.
    pub fn send_eos(&mut self) -> Result<SendStatus> {
        self.send_input(Input::EndOfStream)
    }

    /// Take the next output unit.
    pub fn receive_output(&mut self) -> Result<Received> {
        match self.state {
            CoderState::Unconfigured | CoderState::Configured => {
                Err(Error::invalid_state("coder is not open"))
            }
            CoderState::Closed => Ok(Received::Exhausted),
            CoderState::Opened | CoderState::Draining => match self.machine.as_mut() {
                Some(machine) => machine.receive(&mut self.algorithm),
                None => Err(Error::invalid_state("coder is not open")),
            },
        }
    }

    /// Take the next decoded frame.
    pub fn receive_frame(&mut self) -> Result<Received<Frame<'static>>> {
        if self.direction() != Direction::Decode {
            return Err(Error::invalid_state("encoders produce packets"));
        }
        match self.receive_output()? {
            Received::Ready(unit) => unit
                .into_frame()
                .map(Received::Ready)
                .ok_or_else(|| Error::invalid_state("decoder produced a packet")),
            Received::NotReady => Ok(Received::NotReady),
            Received::Exhausted => Ok(Received::Exhausted),
        }
    }

    /// Take the next encoded packet.
    pub fn receive_packet(&mut self) -> Result<Received<Packet<'static>>> {
        if self.direction() != Direction::Encode {
            return Err(Error::invalid_state("decoders produce frames"));
        }
        match self.receive_output()? {
            Received::Ready(unit) => unit
                .into_packet()
                .map(Received::Ready)
                .ok_or_else(|| Error::invalid_state("encoder produced a frame")),
            Received::NotReady => Ok(Received::NotReady),
            Received::Exhausted => Ok(Received::Exhausted),
        }
    }

    /// Discard queued units and algorithm history, keeping the negotiated
    /// parameters. Reopens a closed coder.
    pub fn reset(&mut self) -> Result<()> {
        match self.state {
            CoderState::Opened | CoderState::Draining => {
                let machine = self
                    .machine
                    .as_mut()
                    .ok_or_else(|| Error::invalid_state("coder is not open"))?;
                machine.reset(&mut self.algorithm);
            }
            CoderState::Closed => {
                self.algorithm.flush();
                self.machine = Some(self.start_machine(&self.negotiated)?);
            }
            CoderState::Unconfigured | CoderState::Configured => {
                return Err(Error::invalid_state("coder was never opened"))
            }
        }
        debug!(codec = self.info.name, from = ?self.state, "coder reset");
        self.short_frame_sent = false;
        self.state = CoderState::Opened;
        Ok(())
    }

    /// Release queued units, algorithm state, the executor and the
    /// allocator. Idempotent; does nothing before open.
    pub fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Some(mut machine) = self.machine.take() {
            machine.close(&mut self.algorithm);
        }
        debug!(codec = self.info.name, "coder closed");
        self.state = CoderState::Closed;
    }
}

impl fmt::Debug for Coder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coder")
            .field("codec", &self.info.name)
            .field("direction", &self.info.direction)
            .field("state", &self.state)
            .field("negotiated", &self.negotiated)
            .field("machine", &self.machine)
            .finish()
    }
}
