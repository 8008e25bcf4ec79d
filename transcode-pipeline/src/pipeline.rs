//! Main transcoding pipeline implementation.
//!
//! A [`Pipeline`] moves one input stream through demux, decode, filter,
//! encode and mux. It is driven either step by step:
//!
//! 1. [`Pipeline::open_input`] classifies the input and opens the decoder.
//! 2. [`Pipeline::open_output`] opens the encoder, adds output streams and
//!    writes the header.
//! 3. [`Pipeline::configure_filters`] builds the filter graph.
//! 4. [`Pipeline::step`] reads and processes one packet until it returns
//!    `false` at end of input.
//! 5. [`Pipeline::flush`] drains the decoder, the filter graph and the
//!    encoder, in that order.
//! 6. [`Pipeline::finalize`] writes the trailer and releases everything.
//!
//! or in one call with [`Pipeline::run`]. Any failure tears the pipeline down
//! and leaves it [`PipelineState::Finalized`].

use crate::capability::{Decoder, Demuxer, Encoder, EncoderConfig, FilterInput, FilterOutputHint, Muxer, StreamParameters};
use crate::classify::classify;
use crate::config::{PipelineConfig, UnselectedStreams};
use crate::error::{PipelineError, Result, Stage};
use crate::filter::FilterStage;
use crate::pump::{PumpOutcome, StagePump};
use crate::registry::Registry;
use crate::writer::OutputWriter;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use transcode_core::error::Error as CoreError;
use transcode_core::{Frame, MediaKind, Packet, TimeBase};

/// Pipeline state.
///
/// States only ever move forward, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// Nothing opened yet.
    Idle,
    /// Input opened, stream selected, decoder open.
    StreamsOpened,
    /// Encoder open, output header written.
    OutputConfigured,
    /// Filter graph built; ready to stream.
    FiltersConfigured,
    /// Reading and transcoding packets.
    Streaming,
    /// End of input reached; the decoder is being drained.
    FlushingDecoder,
    /// The filter graph is being drained.
    FlushingFilter,
    /// The encoder is being drained.
    FlushingEncoder,
    /// Trailer written (or teardown after an error); resources released.
    Finalized,
}

/// Transcoding statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Packets read from the input.
    pub packets_read: u64,
    /// Packets of unselected streams that were discarded.
    pub packets_dropped: u64,
    /// Packets of unselected streams copied to the output.
    pub packets_remuxed: u64,
    /// Frames produced by the decoder.
    pub frames_decoded: u64,
    /// Frames produced by the filter graph.
    pub frames_filtered: u64,
    /// Packets produced by the encoder.
    pub packets_encoded: u64,
    /// Transcoded packets written to the output.
    pub packets_written: u64,
    /// Transcoded packets written while draining the encoder.
    pub flush_packets_written: u64,
}

/// State of the transcoded stream.
struct StreamContext {
    decoder: StagePump<Box<dyn Decoder>>,
    encoder: Option<StagePump<Box<dyn Encoder>>>,
    parameters: StreamParameters,
    kind: MediaKind,
    input_index: usize,
    output_index: usize,
    input_time_base: TimeBase,
    encoder_time_base: TimeBase,
    output_time_base: TimeBase,
}

/// An unselected input stream copied into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemuxContext {
    /// Stream index in the input.
    pub input_index: usize,
    /// Stream index in the output.
    pub output_index: usize,
    /// Time base of the input stream.
    pub input_time_base: TimeBase,
    /// Time base of the output stream.
    pub output_time_base: TimeBase,
}

/// Where encoded packets go.
struct EncodeSink<'a> {
    encoder: &'a mut StagePump<Box<dyn Encoder>>,
    writer: &'a mut OutputWriter,
    stats: &'a mut TranscodeStats,
    time_base: TimeBase,
    output_index: usize,
    flushing: bool,
}

impl EncodeSink<'_> {
    /// Encode one frame (or flush with `None`) and write every packet.
    fn encode(&mut self, frame: Option<Frame>) -> Result<PumpOutcome> {
        let Self {
            encoder,
            writer,
            stats,
            time_base,
            output_index,
            flushing,
        } = self;
        let (time_base, output_index, flushing) = (*time_base, *output_index, *flushing);

        let frame = frame.map(|mut frame| {
            frame.rescale(time_base);
            frame
        });

        encoder.pump(frame, |packet| {
            stats.packets_encoded += 1;
            writer.write(packet, time_base, output_index)?;
            stats.packets_written += 1;
            if flushing {
                stats.flush_packets_written += 1;
            }
            Ok(())
        })
    }

    /// Normalize a decoded frame's timestamp, filter it and encode the result.
    fn filter_and_encode(&mut self, filter: &mut FilterStage, mut frame: Frame) -> Result<()> {
        self.stats.frames_decoded += 1;
        frame.pts = frame.best_effort_timestamp;

        for filtered in filter.push_frame(Some(frame)) {
            let filtered = filtered?;
            self.stats.frames_filtered += 1;
            self.encode(Some(filtered))?;
        }
        Ok(())
    }
}

/// Transcoding pipeline.
pub struct Pipeline {
    /// Configuration.
    config: PipelineConfig,
    /// Codec and format lookup.
    registry: Arc<Registry>,
    /// Current state.
    state: PipelineState,
    demuxer: Option<Box<dyn Demuxer>>,
    stream: Option<StreamContext>,
    filter: Option<FilterStage>,
    writer: Option<OutputWriter>,
    remux: Vec<RemuxContext>,
    unselected: Vec<usize>,
    stats: TranscodeStats,
}

impl Pipeline {
    /// Create a new pipeline.
    pub fn new(config: PipelineConfig, registry: Arc<Registry>) -> Self {
        Self {
            config,
            registry,
            state: PipelineState::Idle,
            demuxer: None,
            stream: None,
            filter: None,
            writer: None,
            remux: Vec::new(),
            unselected: Vec::new(),
            stats: TranscodeStats::default(),
        }
    }

    /// Get current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get statistics so far.
    pub fn stats(&self) -> &TranscodeStats {
        &self.stats
    }

    /// Index of the transcoded stream in the input.
    pub fn input_stream_index(&self) -> Option<usize> {
        self.stream.as_ref().map(|s| s.input_index)
    }

    /// Time base of the transcoded stream in the input.
    pub fn input_time_base(&self) -> Option<TimeBase> {
        self.stream.as_ref().map(|s| s.input_time_base)
    }

    /// Time base the encoder works in, once the output is configured.
    pub fn encoder_time_base(&self) -> Option<TimeBase> {
        self.stream
            .as_ref()
            .filter(|s| s.encoder.is_some())
            .map(|s| s.encoder_time_base)
    }

    /// Time base of the transcoded stream in the output, once the header is written.
    pub fn output_time_base(&self) -> Option<TimeBase> {
        self.stream
            .as_ref()
            .filter(|s| s.encoder.is_some())
            .map(|s| s.output_time_base)
    }

    /// Streams copied from input to output.
    pub fn remux_streams(&self) -> &[RemuxContext] {
        &self.remux
    }

    /// Input streams that are not transcoded.
    pub fn unselected_streams(&self) -> &[usize] {
        &self.unselected
    }

    fn expect_state(&self, op: &'static str, allowed: &[PipelineState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PipelineError::InvalidState { op, state: self.state })
        }
    }

    /// Tear down after any failure other than an out-of-order call.
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if !matches!(e, PipelineError::InvalidState { .. }) {
                warn!(error = %e, state = ?self.state, "Transcode failed, tearing down");
                self.abort();
            }
        }
        result
    }

    /// Classify the input's streams and open a decoder for the selected one.
    pub fn open_input(&mut self, demuxer: Box<dyn Demuxer>) -> Result<()> {
        self.expect_state("open input", &[PipelineState::Idle])?;
        let result = self.try_open_input(demuxer);
        self.guard(result)
    }

    fn try_open_input(&mut self, demuxer: Box<dyn Demuxer>) -> Result<()> {
        self.config.validate()?;

        info!(
            format = demuxer.format_name(),
            streams = demuxer.num_streams(),
            "Input opened"
        );

        let class = classify(demuxer.as_ref(), &self.registry, self.config.selection)?;
        let info = demuxer.stream(class.index).cloned().ok_or_else(|| {
            PipelineError::UnsupportedInputShape(format!("stream {} vanished", class.index))
        })?;
        self.demuxer = Some(demuxer);

        let factory = self
            .registry
            .find_decoder(&class.codec_id)
            .ok_or_else(|| PipelineError::NoDecoderAvailable {
                stream: class.index,
                codec: class.codec_id.clone(),
            })?;
        let decoder = factory
            .open(&info)
            .map_err(|source| PipelineError::UnsupportedCodec {
                stage: Stage::Decode,
                codec: class.codec_id.clone(),
                source,
            })?;

        debug!(
            stream = class.index,
            decoder = factory.name(),
            time_base = %info.time_base,
            "Decoder opened"
        );

        self.stream = Some(StreamContext {
            decoder: StagePump::new(decoder),
            encoder: None,
            parameters: info.parameters,
            kind: class.kind,
            input_index: class.index,
            output_index: 0,
            input_time_base: info.time_base,
            encoder_time_base: info.time_base,
            output_time_base: info.time_base,
        });
        self.unselected = class.unselected;
        self.state = PipelineState::StreamsOpened;
        Ok(())
    }

    /// Open the encoder, add output streams and write the output header.
    pub fn open_output(&mut self, muxer: Box<dyn Muxer>) -> Result<()> {
        self.expect_state("open output", &[PipelineState::StreamsOpened])?;
        let result = self.try_open_output(muxer);
        self.guard(result)
    }

    fn try_open_output(&mut self, muxer: Box<dyn Muxer>) -> Result<()> {
        let state = self.state;
        let missing = |op| PipelineError::InvalidState { op, state };

        let writer = self.writer.insert(OutputWriter::new(muxer));
        let stream = self.stream.as_mut().ok_or_else(|| missing("open output"))?;
        let codec = self.config.encoder.clone();

        let factory = self.registry.find_encoder(&codec).ok_or_else(|| PipelineError::UnsupportedCodec {
            stage: Stage::Encode,
            codec: codec.clone(),
            source: CoreError::unsupported("no encoder registered"),
        })?;

        let params = &stream.parameters;
        let pixel_format = factory
            .supported_pixel_formats()
            .first()
            .copied()
            .or(params.pixel_format)
            .ok_or_else(|| {
                PipelineError::UnsupportedInputShape(format!(
                    "{} stream {} has no pixel format",
                    stream.kind, stream.input_index
                ))
            })?;
        let time_base = self
            .config
            .encoder_time_base
            .or_else(|| params.frame_rate.and_then(TimeBase::from_frame_rate))
            .unwrap_or(stream.input_time_base);

        let encoder_config = EncoderConfig {
            codec_id: codec.clone(),
            width: params.width,
            height: params.height,
            sample_aspect_ratio: params.sample_aspect_ratio,
            pixel_format,
            time_base,
            global_header: writer.requires_global_header(),
            options: self.config.encoder_options.clone(),
        };
        let encoder = factory
            .open(&encoder_config)
            .map_err(|source| PipelineError::UnsupportedCodec {
                stage: Stage::Encode,
                codec: codec.clone(),
                source,
            })?;

        stream.encoder_time_base = encoder.time_base();
        stream.output_index = writer.add_stream(encoder.parameters(), stream.encoder_time_base)?;
        debug!(
            encoder = factory.name(),
            codec = %codec,
            pixel_format = %pixel_format,
            time_base = %stream.encoder_time_base,
            global_header = encoder_config.global_header,
            "Encoder opened"
        );
        stream.encoder = Some(StagePump::new(encoder));

        if self.config.unselected == UnselectedStreams::Remux {
            let demuxer = self.demuxer.as_ref().ok_or_else(|| missing("open output"))?;
            for &input_index in &self.unselected {
                let Some(info) = demuxer.stream(input_index) else {
                    continue;
                };
                let output_index = writer.add_stream(&info.parameters, info.time_base)?;
                self.remux.push(RemuxContext {
                    input_index,
                    output_index,
                    input_time_base: info.time_base,
                    output_time_base: info.time_base,
                });
            }
        }

        writer.write_header(&self.config.muxer_options)?;

        stream.output_time_base = writer
            .stream_time_base(stream.output_index)
            .unwrap_or(stream.encoder_time_base);
        for remux in &mut self.remux {
            if let Some(tb) = writer.stream_time_base(remux.output_index) {
                remux.output_time_base = tb;
            }
        }

        info!(
            format = writer.format_name(),
            streams = 1 + self.remux.len(),
            time_base = %stream.output_time_base,
            "Output opened"
        );
        self.state = PipelineState::OutputConfigured;
        Ok(())
    }

    /// Build the filter graph between decoder and encoder.
    pub fn configure_filters(&mut self) -> Result<()> {
        self.expect_state("configure filters", &[PipelineState::OutputConfigured])?;
        let result = self.try_configure_filters();
        self.guard(result)
    }

    fn try_configure_filters(&mut self) -> Result<()> {
        let state = self.state;
        let stream = self
            .stream
            .as_ref()
            .ok_or(PipelineError::InvalidState { op: "configure filters", state })?;
        let encoder = stream
            .encoder
            .as_ref()
            .ok_or(PipelineError::InvalidState { op: "configure filters", state })?;

        let params = &stream.parameters;
        let encoder_format = encoder.get_ref().parameters().pixel_format;
        let hint = FilterOutputHint {
            pixel_format: encoder_format.or(params.pixel_format).ok_or_else(|| {
                PipelineError::UnsupportedInputShape("encoder has no pixel format".into())
            })?,
        };
        let input = FilterInput {
            kind: stream.kind,
            width: params.width,
            height: params.height,
            pixel_format: params.pixel_format.unwrap_or(hint.pixel_format),
            time_base: stream.input_time_base,
            sample_aspect_ratio: params.sample_aspect_ratio,
        };

        let stage = FilterStage::configure(self.registry.filter_builder(), &self.config.filter, &input, &hint)?;
        self.filter = Some(stage);
        self.state = PipelineState::FiltersConfigured;
        Ok(())
    }

    /// Read and process one packet.
    ///
    /// Returns `false` once the input is exhausted; the pipeline is then
    /// ready to [`flush`](Self::flush).
    pub fn step(&mut self) -> Result<bool> {
        self.expect_state("step", &[PipelineState::FiltersConfigured, PipelineState::Streaming])?;
        self.state = PipelineState::Streaming;
        let result = self.try_step();
        self.guard(result)
    }

    fn try_step(&mut self) -> Result<bool> {
        let state = self.state;
        let demuxer = self
            .demuxer
            .as_mut()
            .ok_or(PipelineError::InvalidState { op: "step", state })?;

        let Some(packet) = demuxer
            .read_packet()
            .map_err(|source| PipelineError::Read { source })?
        else {
            info!(packets = self.stats.packets_read, "End of input");
            self.state = PipelineState::FlushingDecoder;
            return Ok(false);
        };
        self.stats.packets_read += 1;

        let index = packet.stream_index as usize;
        if self.input_stream_index() == Some(index) {
            self.decode(Some(packet))?;
        } else if let Some(remux) = self.remux.iter().find(|r| r.input_index == index).copied() {
            let writer = self
                .writer
                .as_mut()
                .ok_or(PipelineError::InvalidState { op: "step", state })?;
            writer.write(packet, remux.input_time_base, remux.output_index)?;
            self.stats.packets_remuxed += 1;
        } else {
            trace!(stream = index, "Dropping packet of unselected stream");
            self.stats.packets_dropped += 1;
        }

        let interval = self.config.progress_interval;
        if interval > 0 && self.stats.packets_read % interval == 0 {
            self.report_progress();
        }

        Ok(true)
    }

    /// Run the decode pump and push every frame through filter and encoder.
    fn decode(&mut self, packet: Option<Packet>) -> Result<PumpOutcome> {
        let state = self.state;
        let missing = || PipelineError::InvalidState { op: "decode", state };

        let Self {
            stream,
            filter,
            writer,
            stats,
            ..
        } = self;
        let stream = stream.as_mut().ok_or_else(missing)?;
        let filter = filter.as_mut().ok_or_else(missing)?;
        let writer = writer.as_mut().ok_or_else(missing)?;
        let StreamContext {
            decoder,
            encoder,
            encoder_time_base,
            output_index,
            ..
        } = stream;
        let encoder = encoder.as_mut().ok_or_else(missing)?;

        let mut sink = EncodeSink {
            encoder,
            writer,
            stats,
            time_base: *encoder_time_base,
            output_index: *output_index,
            flushing: false,
        };
        decoder.pump(packet, |frame| sink.filter_and_encode(filter, frame))
    }

    /// Drain the decoder, then the filter graph, then the encoder.
    pub fn flush(&mut self) -> Result<()> {
        self.expect_state("flush", &[PipelineState::FlushingDecoder])?;
        let result = self.try_flush();
        self.guard(result)
    }

    fn try_flush(&mut self) -> Result<()> {
        info!("Flushing decoder");
        let decoded = self.stats.frames_decoded;
        self.decode(None)?;
        debug!(frames = self.stats.frames_decoded - decoded, "Decoder drained");

        self.state = PipelineState::FlushingFilter;
        info!("Flushing filter graph");

        let state = self.state;
        let missing = || PipelineError::InvalidState { op: "flush", state };
        let Self {
            stream,
            filter,
            writer,
            stats,
            ..
        } = self;
        let stream = stream.as_mut().ok_or_else(missing)?;
        let filter = filter.as_mut().ok_or_else(missing)?;
        let writer = writer.as_mut().ok_or_else(missing)?;
        let encoder = stream.encoder.as_mut().ok_or_else(missing)?;

        let mut sink = EncodeSink {
            encoder,
            writer,
            stats,
            time_base: stream.encoder_time_base,
            output_index: stream.output_index,
            flushing: false,
        };
        for filtered in filter.push_frame(None) {
            let filtered = filtered?;
            sink.stats.frames_filtered += 1;
            sink.encode(Some(filtered))?;
        }

        self.state = PipelineState::FlushingEncoder;
        sink.flushing = true;
        if sink.encoder.get_ref().has_delay() {
            info!("Flushing encoder");
            sink.encode(None)?;
            debug!(packets = sink.stats.flush_packets_written, "Encoder drained");
        } else {
            debug!("Encoder has no delay, skipping flush");
        }
        Ok(())
    }

    /// Write the trailer and release every resource.
    pub fn finalize(&mut self) -> Result<()> {
        self.expect_state("finalize", &[PipelineState::FlushingEncoder])?;
        let result = self.try_finalize();
        self.guard(result)
    }

    fn try_finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_trailer()?;
        }
        self.release();
        self.state = PipelineState::Finalized;

        info!(
            packets_read = self.stats.packets_read,
            frames_decoded = self.stats.frames_decoded,
            packets_written = self.stats.packets_written,
            packets_dropped = self.stats.packets_dropped,
            packets_remuxed = self.stats.packets_remuxed,
            "Transcode finished"
        );
        Ok(())
    }

    /// Stop the pipeline: write the trailer if a header was written, then
    /// release every resource. Does nothing once finalized.
    pub fn abort(&mut self) {
        if self.state == PipelineState::Finalized {
            return;
        }
        if let Some(writer) = self.writer.as_mut() {
            if writer.header_written() && !writer.trailer_written() {
                if let Err(e) = writer.write_trailer() {
                    warn!(error = %e, "Failed to write trailer during teardown");
                }
            }
        }
        self.release();
        self.state = PipelineState::Finalized;
    }

    /// Drop stages in reverse order of use. Safe to call repeatedly.
    fn release(&mut self) {
        if self.filter.take().is_some() {
            debug!("Filter graph released");
        }
        if let Some(stream) = self.stream.as_mut() {
            if stream.encoder.take().is_some() {
                debug!("Encoder released");
            }
        }
        if self.stream.take().is_some() {
            debug!("Decoder released");
        }
        if self.writer.take().is_some() {
            debug!("Muxer released");
        }
        if self.demuxer.take().is_some() {
            debug!("Demuxer released");
        }
    }

    /// Run the whole transcode.
    pub fn run(&mut self, demuxer: Box<dyn Demuxer>, muxer: Box<dyn Muxer>) -> Result<TranscodeStats> {
        self.open_input(demuxer)?;
        self.open_output(muxer)?;
        self.configure_filters()?;

        while self.step()? {}

        self.flush()?;
        self.finalize()?;
        Ok(self.stats.clone())
    }

    /// Report progress.
    fn report_progress(&self) {
        info!(
            packets = self.stats.packets_read,
            frames = self.stats.frames_decoded,
            written = self.stats.packets_written,
            "Progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered() {
        assert!(PipelineState::Idle < PipelineState::StreamsOpened);
        assert!(PipelineState::Streaming < PipelineState::FlushingDecoder);
        assert!(PipelineState::FlushingEncoder < PipelineState::Finalized);
    }

    #[test]
    fn test_out_of_order_calls() {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(Registry::new()));

        assert!(matches!(
            pipeline.step(),
            Err(PipelineError::InvalidState { op: "step", state: PipelineState::Idle })
        ));
        assert!(matches!(pipeline.flush(), Err(PipelineError::InvalidState { .. })));
        assert!(matches!(pipeline.finalize(), Err(PipelineError::InvalidState { .. })));
        assert!(matches!(pipeline.configure_filters(), Err(PipelineError::InvalidState { .. })));
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn test_abort_is_idempotent() {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(Registry::new()));
        pipeline.abort();
        pipeline.abort();
        assert_eq!(pipeline.state(), PipelineState::Finalized);
        assert!(matches!(pipeline.step(), Err(PipelineError::InvalidState { .. })));
    }
}
