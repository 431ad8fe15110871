//! What an algorithm sees of its coder while processing.

use crate::config::{CoderConfig, CoderFlags, Negotiated};
use crate::info::Direction;
use crate::parallel::Executor;
use crate::traits::MediaUnit;
use std::collections::VecDeque;
use std::sync::Arc;
use transcode_core::side_data::SideDataKind;
use transcode_core::{
    AddPolicy, Error, Frame, FrameAllocator, FrameFlags, FrameSideDataType, Packet, PacketFlags,
    Result, SideDataSet, FRAME_ALIGN,
};

/// Output queue and shared services handed to algorithms.
pub struct CodingContext {
    direction: Direction,
    output: VecDeque<MediaUnit>,
    allocator: Arc<dyn FrameAllocator>,
    executor: Arc<dyn Executor>,
    config: CoderConfig,
    negotiated: Negotiated,
    global_side_data: SideDataSet<FrameSideDataType>,
}

impl CodingContext {
    pub(crate) fn new(
        direction: Direction,
        allocator: Arc<dyn FrameAllocator>,
        executor: Arc<dyn Executor>,
        config: CoderConfig,
        negotiated: Negotiated,
        global_side_data: SideDataSet<FrameSideDataType>,
    ) -> Self {
        Self {
            direction,
            output: VecDeque::new(),
            allocator,
            executor,
            config,
            negotiated,
            global_side_data,
        }
    }

    /// Configuration the coder was opened with.
    pub fn config(&self) -> &CoderConfig {
        &self.config
    }

    /// Facts negotiated at open.
    pub fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    /// Executor for slice or frame jobs.
    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Whether slice threading was negotiated.
    pub fn slice_threads(&self) -> usize {
        if self.negotiated.thread_type.contains(crate::config::ThreadType::SLICE) {
            self.negotiated.thread_count.max(1)
        } else {
            1
        }
    }

    /// Attach planes to a described frame through the coder's allocator.
    pub fn get_buffer(&self, frame: &mut Frame<'static>) -> Result<()> {
        self.allocator.alloc_frame(frame, FRAME_ALIGN)
    }

    /// Allocate an output packet through the coder's allocator.
    pub fn alloc_packet(&self, size: usize) -> Result<Packet<'static>> {
        self.allocator.alloc_packet(size)
    }

    /// Stream-global side data set on the coder.
    pub fn global_side_data(&self) -> &SideDataSet<FrameSideDataType> {
        &self.global_side_data
    }

    /// Queue a decoded frame for the caller.
    ///
    /// Frames flagged for discard are dropped, as are corrupt frames unless
    /// the coder was opened with [`CoderFlags::OUTPUT_CORRUPT`]. Stream-global
    /// side data missing from the frame is attached first.
    pub fn emit_frame(&mut self, mut frame: Frame<'static>) -> Result<()> {
        if self.direction != Direction::Decode {
            return Err(Error::invalid_state("encoders emit packets"));
        }
        if frame.flags.contains(FrameFlags::DISCARD) {
            tracing::trace!(pts = ?frame.pts, "discarded frame dropped");
            return Ok(());
        }
        if frame.flags.contains(FrameFlags::CORRUPT)
            && !self.config.flags.contains(CoderFlags::OUTPUT_CORRUPT)
        {
            tracing::debug!(pts = ?frame.pts, "corrupt frame dropped");
            return Ok(());
        }
        for entry in self.global_side_data.iter() {
            if !frame.side_data().contains(entry.kind()) {
                frame
                    .side_data_mut()
                    .add(entry.kind(), entry.payload().clone(), AddPolicy::Replace)?;
            }
        }
        self.output.push_back(MediaUnit::Frame(frame));
        Ok(())
    }

    /// Queue an encoded packet for the caller.
    pub fn emit_packet(&mut self, packet: Packet<'static>) -> Result<()> {
        if self.direction != Direction::Encode {
            return Err(Error::invalid_state("decoders emit frames"));
        }
        self.output.push_back(MediaUnit::Packet(packet));
        Ok(())
    }

    /// Carry timing, flags, tag and side data from an input packet to the
    /// frame decoded from it.
    pub fn copy_packet_props(&self, packet: &Packet<'_>, frame: &mut Frame<'static>) {
        frame.pts = packet.pts;
        frame.pkt_dts = packet.dts;
        frame.duration = packet.duration;
        frame.time_base = packet.time_base;
        frame.opaque = packet.opaque.clone();
        frame.flags.set(FrameFlags::KEYFRAME, packet.is_keyframe());
        frame.flags.set(FrameFlags::CORRUPT, packet.flags.contains(PacketFlags::CORRUPT));
        frame.flags.set(FrameFlags::DISCARD, packet.flags.contains(PacketFlags::DISCARD));
        for entry in packet.side_data().iter() {
            let Some(kind) = entry.kind().frame_type() else {
                continue;
            };
            if let Err(e) = frame
                .side_data_mut()
                .add(kind, entry.payload().clone(), AddPolicy::Replace)
            {
                tracing::debug!(
                    side_data = kind.name(),
                    error = %e,
                    "side data not carried to frame"
                );
            }
        }
    }

    /// Carry timing and tag from an input frame to the packet encoded from it.
    pub fn copy_frame_props(&self, frame: &Frame<'_>, packet: &mut Packet<'static>) {
        packet.pts = frame.pts;
        packet.duration = frame.duration;
        packet.time_base = frame.time_base;
        packet.opaque = frame.opaque.clone();
    }

    pub(crate) fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    pub(crate) fn output_len(&self) -> usize {
        self.output.len()
    }

    pub(crate) fn pop_output(&mut self) -> Option<MediaUnit> {
        self.output.pop_front()
    }

    pub(crate) fn clear_output(&mut self) {
        self.output.clear();
    }
}

impl std::fmt::Debug for CodingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodingContext")
            .field("direction", &self.direction)
            .field("output", &self.output.len())
            .field("negotiated", &self.negotiated)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_context(direction: Direction, config: CoderConfig) -> CodingContext {
    CodingContext::new(
        direction,
        Arc::new(transcode_core::DefaultAllocator),
        Arc::new(crate::parallel::SerialExecutor),
        config,
        Negotiated::default(),
        SideDataSet::new(),
    )
}
