//! The send/receive state machine wrapped around an opened algorithm.
//!
//! Inputs wait in a bounded queue and are handed to the algorithm only while
//! no output or error is pending. After every call either the input queue is
//! empty or the next receive has something to hand over.
//!
//! `Busy` is only reported while output or an error is pending and queued
//! input (plus the pending item) fills `capacity`, so the receive that follows
//! always makes progress. A successful receive grants one admission: the
//! retried send is accepted even if the algorithm left more output queued.
//! Queued input therefore stays below `capacity` plus the output still
//! waiting for the caller.

use crate::context::CodingContext;
use crate::traits::{Algorithm, MediaUnit};
use std::collections::VecDeque;
use transcode_core::metrics::timed;
use transcode_core::{record_counter, record_gauge, Error, Result};

/// Outcome of handing input to a coder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendStatus {
    /// The unit (or end of stream) was taken.
    Accepted,
    /// The queues are full; receive output, then retry the same input.
    Busy,
    /// End of stream was already signalled; nothing more is taken.
    StreamEnded,
}

/// Outcome of asking a coder for output.
#[derive(Debug, Clone, PartialEq)]
pub enum Received<T = MediaUnit> {
    /// An independently owned output unit.
    Ready(T),
    /// More input is needed before output can be produced.
    NotReady,
    /// Fully drained after end of stream; reset to continue.
    Exhausted,
}

impl<T> Received<T> {
    /// Convert the payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Received<U> {
        match self {
            Self::Ready(t) => Received::Ready(f(t)),
            Self::NotReady => Received::NotReady,
            Self::Exhausted => Received::Exhausted,
        }
    }

    /// The unit, if ready.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(t) => Some(t),
            _ => None,
        }
    }

    /// Check whether a unit was returned.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Check whether the coder is drained.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

#[derive(Debug)]
pub(crate) struct CodingStateMachine {
    ctx: CodingContext,
    input: VecDeque<MediaUnit>,
    batch: Vec<MediaUnit>,
    batch_size: usize,
    capacity: usize,
    eos: bool,
    drained: bool,
    pending_error: Option<Error>,
    failed: bool,
    credit: bool,
    codec: &'static str,
}

impl CodingStateMachine {
    pub(crate) fn new(
        ctx: CodingContext,
        capacity: usize,
        batch_size: usize,
        codec: &'static str,
    ) -> Self {
        Self {
            ctx,
            input: VecDeque::with_capacity(capacity),
            batch: Vec::with_capacity(batch_size),
            batch_size: batch_size.max(1),
            capacity: capacity.max(1),
            eos: false,
            drained: false,
            pending_error: None,
            failed: false,
            credit: false,
            codec,
        }
    }

    fn buffered(&self) -> usize {
        self.input.len() + self.ctx.output_len()
    }

    /// Status a send would get without taking the unit, or `None` if it
    /// would be accepted.
    pub(crate) fn admission(&self) -> Result<Option<SendStatus>> {
        if self.failed {
            return Err(Error::invalid_state("coder failed; reset it to continue"));
        }
        if self.eos {
            return Ok(Some(SendStatus::StreamEnded));
        }
        let progress = self.ctx.has_output() || self.pending_error.is_some();
        if progress && !self.credit && self.input.len() + 1 >= self.capacity {
            record_counter!("coder.send.busy", 1, "codec" => self.codec);
            return Ok(Some(SendStatus::Busy));
        }
        Ok(None)
    }

    /// Queue an owned unit. Callers check [`admission`](Self::admission) first.
    pub(crate) fn push(&mut self, unit: MediaUnit, algorithm: &mut Algorithm) -> SendStatus {
        self.input.push_back(unit);
        self.credit = false;
        record_counter!("coder.send.accepted", 1, "codec" => self.codec);
        self.pump(algorithm);
        record_gauge!("coder.queue.depth", self.buffered() as f64, "codec" => self.codec);
        tracing::trace!(codec = self.codec, buffered = self.buffered(), "input accepted");
        SendStatus::Accepted
    }

    pub(crate) fn send_eos(&mut self, algorithm: &mut Algorithm) -> Result<SendStatus> {
        if self.failed {
            return Err(Error::invalid_state("coder failed; reset it to continue"));
        }
        if self.eos {
            return Ok(SendStatus::StreamEnded);
        }
        self.eos = true;
        tracing::trace!(codec = self.codec, "end of stream signalled");
        self.pump(algorithm);
        Ok(SendStatus::Accepted)
    }

    pub(crate) fn receive(&mut self, algorithm: &mut Algorithm) -> Result<Received> {
        self.pump(algorithm);
        if let Some(unit) = self.ctx.pop_output() {
            record_counter!("coder.receive.units", 1, "codec" => self.codec);
            self.credit = true;
            self.pump(algorithm);
            return Ok(Received::Ready(unit));
        }
        if let Some(err) = self.pending_error.take() {
            record_counter!("coder.algorithm.faults", 1, "codec" => self.codec);
            tracing::warn!(
                codec = self.codec,
                error = %err,
                fatal = self.failed,
                "algorithm fault"
            );
            self.credit = true;
            self.pump(algorithm);
            return Err(err);
        }
        if self.failed || (self.eos && self.drained) {
            return Ok(Received::Exhausted);
        }
        Ok(Received::NotReady)
    }

    fn pump(&mut self, algorithm: &mut Algorithm) {
        while !self.ctx.has_output() && self.pending_error.is_none() && !self.failed {
            if let Some(unit) = self.input.pop_front() {
                if self.batch_size > 1 {
                    self.batch.push(unit);
                    if self.batch.len() >= self.batch_size {
                        self.run_batch(algorithm);
                    }
                } else {
                    let result = timed("coder.process.duration_ns", || {
                        algorithm.process(unit, &mut self.ctx)
                    });
                    self.settle(result);
                }
            } else if self.eos && !self.drained {
                if !self.batch.is_empty() {
                    self.run_batch(algorithm);
                    continue;
                }
                self.drained = true;
                let result = algorithm.drain(&mut self.ctx);
                self.settle(result);
            } else {
                break;
            }
        }
    }

    fn run_batch(&mut self, algorithm: &mut Algorithm) {
        let batch = std::mem::take(&mut self.batch);
        tracing::trace!(codec = self.codec, units = batch.len(), "processing batch");
        let result = timed("coder.process.duration_ns", || {
            algorithm.process_batch(batch, &mut self.ctx)
        });
        self.settle(result);
    }

    fn settle(&mut self, result: Result<()>) {
        let Err(err) = result else {
            return;
        };
        if !err.is_recoverable() {
            self.failed = true;
            self.input.clear();
            self.batch.clear();
        }
        self.pending_error = Some(err);
    }

    pub(crate) fn reset(&mut self, algorithm: &mut Algorithm) {
        self.input.clear();
        self.batch.clear();
        self.ctx.clear_output();
        self.eos = false;
        self.drained = false;
        self.pending_error = None;
        self.failed = false;
        self.credit = false;
        algorithm.flush();
    }

    pub(crate) fn close(&mut self, algorithm: &mut Algorithm) {
        self.input.clear();
        self.batch.clear();
        self.ctx.clear_output();
        self.pending_error = None;
        algorithm.close();
    }
}
