//! Decode-then-encode pump over two opened coders.

use crate::{Error, Frame, Packet, Result};
use transcode_codecs::{Coder, Direction, Received, SendStatus};
use transcode_core::record_counter;
use tracing::{debug, info, warn};

/// Progress callback type.
pub type ProgressCallback = Box<dyn FnMut(&TranscodeStats) + Send>;

/// Hook applied to every decoded frame before it is encoded.
pub type FrameHook = Box<dyn FnMut(&mut Frame<'static>) -> Result<()> + Send>;

/// Transcoding statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Packets handed to the decoder.
    pub packets_in: u64,
    /// Frames received from the decoder.
    pub frames_decoded: u64,
    /// Frames accepted by the encoder.
    pub frames_encoded: u64,
    /// Packets handed to the sink.
    pub packets_out: u64,
    /// Bytes handed to the decoder.
    pub bytes_in: u64,
    /// Bytes handed to the sink.
    pub bytes_out: u64,
    /// Recoverable decoder faults that were skipped.
    pub decode_errors: u64,
    /// Times either coder pushed back with `Busy`.
    pub busy_signals: u64,
    /// Presentation timestamp of the last packet handed to the sink.
    pub last_pts: Option<i64>,
}

impl TranscodeStats {
    /// Get compression ratio.
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_in > 0 && self.bytes_out > 0 {
            self.bytes_in as f64 / self.bytes_out as f64
        } else {
            1.0
        }
    }
}

/// Feeds compressed units through a decoder, an optional frame hook and an
/// encoder, honoring back-pressure on both coders.
pub struct Transcoder {
    decoder: Coder,
    encoder: Coder,
    hook: Option<FrameHook>,
    progress_callback: Option<ProgressCallback>,
    skip_corrupt: bool,
    finished: bool,
    stats: TranscodeStats,
}

impl Transcoder {
    /// Pair an opened decoder with an opened encoder of the same media type.
    pub fn new(decoder: Coder, encoder: Coder) -> Result<Self> {
        if decoder.direction() != Direction::Decode || encoder.direction() != Direction::Encode {
            return Err(Error::invalid_param("transcoder needs a decoder and an encoder"));
        }
        if decoder.media_type() != encoder.media_type() {
            return Err(Error::invalid_param(format!(
                "{} decoder cannot feed {} encoder",
                decoder.media_type(),
                encoder.media_type()
            )));
        }
        if !decoder.is_open() || !encoder.is_open() {
            return Err(Error::invalid_state("both coders must be opened"));
        }
        info!(
            decoder = decoder.info().name,
            encoder = encoder.info().name,
            "transcoder ready"
        );
        Ok(Self {
            decoder,
            encoder,
            hook: None,
            progress_callback: None,
            skip_corrupt: false,
            finished: false,
            stats: TranscodeStats::default(),
        })
    }

    /// Apply `hook` to each decoded frame, made writable first.
    pub fn with_frame_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&mut Frame<'static>) -> Result<()> + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Set progress callback, invoked after every pushed packet.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&TranscodeStats) + Send + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Skip packets the decoder rejects as corrupt instead of failing.
    pub fn skip_corrupt(mut self, skip: bool) -> Self {
        self.skip_corrupt = skip;
        self
    }

    /// Get current statistics.
    pub fn stats(&self) -> &TranscodeStats {
        &self.stats
    }

    /// The decoding side.
    pub fn decoder(&self) -> &Coder {
        &self.decoder
    }

    /// The encoding side.
    pub fn encoder(&self) -> &Coder {
        &self.encoder
    }

    /// Check whether [`finish`](Self::finish) has completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Give back both coders.
    pub fn into_parts(self) -> (Coder, Coder) {
        (self.decoder, self.encoder)
    }

    /// Transcode one packet, handing every produced packet to `sink`.
    pub fn push<S>(&mut self, packet: &Packet<'_>, sink: &mut S) -> Result<()>
    where
        S: FnMut(Packet<'static>) -> Result<()>,
    {
        if self.finished {
            return Err(Error::invalid_state("transcoder already finished; reset it"));
        }
        loop {
            match self.decoder.send_packet(packet)? {
                SendStatus::Accepted => break,
                SendStatus::Busy => {
                    self.stats.busy_signals += 1;
                    self.pull_decoder(sink)?;
                }
                SendStatus::StreamEnded => {
                    return Err(Error::invalid_state("decoder already at end of stream"));
                }
            }
        }
        self.stats.packets_in += 1;
        self.stats.bytes_in += packet.len() as u64;
        record_counter!("transcode.packets.in", 1);
        self.pull_decoder(sink)?;
        self.report();
        Ok(())
    }

    /// Drain the decoder, then the encoder, returning the final statistics.
    pub fn finish<S>(&mut self, sink: &mut S) -> Result<TranscodeStats>
    where
        S: FnMut(Packet<'static>) -> Result<()>,
    {
        if !self.finished {
            self.decoder.send_eos()?;
            self.pull_decoder(sink)?;
            self.encoder.send_eos()?;
            self.pull_encoder(sink)?;
            self.finished = true;
            self.report();
            info!(
                packets_in = self.stats.packets_in,
                packets_out = self.stats.packets_out,
                frames = self.stats.frames_decoded,
                "transcode complete"
            );
        }
        Ok(self.stats.clone())
    }

    /// Reset both coders and the statistics for a new segment.
    pub fn reset(&mut self) -> Result<()> {
        self.decoder.reset()?;
        self.encoder.reset()?;
        self.finished = false;
        self.stats = TranscodeStats::default();
        debug!("transcoder reset");
        Ok(())
    }

    fn pull_decoder<S>(&mut self, sink: &mut S) -> Result<()>
    where
        S: FnMut(Packet<'static>) -> Result<()>,
    {
        loop {
            match self.decoder.receive_frame() {
                Ok(Received::Ready(frame)) => {
                    self.stats.frames_decoded += 1;
                    self.feed_encoder(frame, sink)?;
                }
                Ok(Received::NotReady | Received::Exhausted) => return Ok(()),
                Err(e) if self.skip_corrupt && e.is_recoverable() => {
                    warn!(error = %e, "skipping corrupt input");
                    self.stats.decode_errors += 1;
                    record_counter!("transcode.decode.skipped", 1);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn feed_encoder<S>(&mut self, mut frame: Frame<'static>, sink: &mut S) -> Result<()>
    where
        S: FnMut(Packet<'static>) -> Result<()>,
    {
        if let Some(hook) = self.hook.as_mut() {
            frame.make_writable()?;
            hook(&mut frame)?;
        }
        loop {
            match self.encoder.send_frame(&frame)? {
                SendStatus::Accepted => break,
                SendStatus::Busy => {
                    self.stats.busy_signals += 1;
                    self.pull_encoder(sink)?;
                }
                SendStatus::StreamEnded => {
                    return Err(Error::invalid_state("encoder already at end of stream"));
                }
            }
        }
        self.stats.frames_encoded += 1;
        self.pull_encoder(sink)
    }

    fn pull_encoder<S>(&mut self, sink: &mut S) -> Result<()>
    where
        S: FnMut(Packet<'static>) -> Result<()>,
    {
        while let Received::Ready(packet) = self.encoder.receive_packet()? {
            self.stats.packets_out += 1;
            self.stats.bytes_out += packet.len() as u64;
            self.stats.last_pts = packet.pts.or(self.stats.last_pts);
            record_counter!("transcode.packets.out", 1);
            sink(packet)?;
        }
        Ok(())
    }

    fn report(&mut self) {
        if let Some(callback) = self.progress_callback.as_mut() {
            callback(&self.stats);
        }
    }
}

impl std::fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcoder")
            .field("decoder", &self.decoder)
            .field("encoder", &self.encoder)
            .field("has_hook", &self.hook.is_some())
            .field("skip_corrupt", &self.skip_corrupt)
            .field("finished", &self.finished)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CodecId, CoderConfig, PixelFormat, TimeBase};

    fn video_pair(width: u32, height: u32, b_frames: u32) -> (Coder, Coder) {
        let config = CoderConfig::video(width, height, PixelFormat::Gray8)
            .with_time_base(TimeBase::new(1, 25));
        let mut decoder = Coder::decoder(CodecId::RawVideo).unwrap();
        decoder.set_config(config.clone()).unwrap();
        decoder.open().unwrap();
        let mut encoder = Coder::encoder(CodecId::RawVideo).unwrap();
        encoder.set_config(config.with_max_b_frames(b_frames)).unwrap();
        encoder.open().unwrap();
        (decoder, encoder)
    }

    fn packet(fill: u8, pts: i64) -> Packet<'static> {
        Packet::copy_from_slice(&[fill; 16])
            .unwrap()
            .with_timestamps(Some(pts), Some(pts))
    }

    #[test]
    fn test_hook_sees_writable_frames() {
        let (decoder, encoder) = video_pair(4, 4, 0);
        let mut transcoder = Transcoder::new(decoder, encoder)
            .unwrap()
            .with_frame_hook(|frame| {
                let plane = frame.data_mut(0).ok_or_else(|| Error::invalid_state("read-only"))?;
                plane.iter_mut().for_each(|b| *b = !*b);
                Ok(())
            });
        let mut out = Vec::new();
        let mut sink = |p: Packet<'static>| -> Result<()> {
            out.push(p);
            Ok(())
        };
        transcoder.push(&packet(0x0F, 0), &mut sink).unwrap();
        transcoder.push(&packet(0x01, 1), &mut sink).unwrap();
        let stats = transcoder.finish(&mut sink).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].data().iter().all(|&b| b == 0xF0));
        assert!(out[1].data().iter().all(|&b| b == 0xFE));
        assert_eq!(stats.packets_in, 2);
        assert_eq!(stats.packets_out, 2);
        assert_eq!(stats.bytes_out, 32);
        assert_eq!(stats.last_pts, Some(1));
    }

    #[test]
    fn test_rejects_mismatched_coders() {
        let (decoder, encoder) = video_pair(4, 4, 0);
        let err = Transcoder::new(encoder, decoder).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);

        let closed = Coder::decoder(CodecId::RawVideo).unwrap();
        let (_, encoder) = video_pair(4, 4, 0);
        let err = Transcoder::new(closed, encoder).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidState);
    }

    #[test]
    fn test_push_after_finish_needs_reset() {
        let (decoder, encoder) = video_pair(4, 4, 1);
        let mut transcoder = Transcoder::new(decoder, encoder).unwrap();
        let mut count = 0;
        let mut sink = |_: Packet<'static>| -> Result<()> {
            count += 1;
            Ok(())
        };
        for pts in 0..3 {
            transcoder.push(&packet(pts as u8, pts), &mut sink).unwrap();
        }
        transcoder.finish(&mut sink).unwrap();
        assert!(transcoder.is_finished());
        assert!(transcoder.push(&packet(9, 9), &mut sink).is_err());

        transcoder.reset().unwrap();
        transcoder.push(&packet(9, 0), &mut sink).unwrap();
        let stats = transcoder.finish(&mut sink).unwrap();
        assert_eq!(stats.packets_out, 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_stats_compression_ratio() {
        let stats = TranscodeStats {
            bytes_in: 1000,
            bytes_out: 500,
            ..Default::default()
        };
        assert!((stats.compression_ratio() - 2.0).abs() < 0.001);
    }
}
