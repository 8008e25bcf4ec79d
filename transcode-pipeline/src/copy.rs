//! Passthrough codec.
//!
//! The copy decoder wraps each packet's payload in a frame without looking at
//! it, and the copy encoder unwraps it again. Together they let a pipeline run
//! end to end for any codec id. The encoder can be told to hold back a fixed
//! number of frames, which mimics the lookahead of real encoders.

use crate::capability::{
    Decoder, DecoderFactory, Encoder, EncoderConfig, EncoderFactory, Receive, StreamInfo,
    StreamParameters,
};
use std::collections::VecDeque;
use tracing::trace;
use transcode_core::error::CodecError;
use transcode_core::{
    CodecId, Duration, Frame, FrameBuffer, Packet, PictureKind, PixelFormat, Result, TimeBase,
    Timestamp,
};

/// Factory for passthrough decoders and encoders.
#[derive(Debug, Clone)]
pub struct CopyCodec {
    codec_id: CodecId,
    delay: usize,
}

impl CopyCodec {
    /// Create a passthrough codec that labels its output with `codec_id`.
    pub fn new(codec_id: CodecId) -> Self {
        Self { codec_id, delay: 0 }
    }

    /// Make encoders hold back `frames` frames until flushed.
    #[must_use]
    pub fn with_delay(mut self, frames: usize) -> Self {
        self.delay = frames;
        self
    }

    /// Encoder delay in frames.
    pub fn delay(&self) -> usize {
        self.delay
    }
}

impl DecoderFactory for CopyCodec {
    fn name(&self) -> &str {
        "copy"
    }

    fn open(&self, stream: &StreamInfo) -> Result<Box<dyn Decoder>> {
        let params = &stream.parameters;
        Ok(Box::new(CopyDecoder {
            width: params.width,
            height: params.height,
            format: params.pixel_format.unwrap_or(PixelFormat::Gray8),
            time_base: stream.time_base,
            queue: VecDeque::new(),
            flushed: false,
        }))
    }
}

impl EncoderFactory for CopyCodec {
    fn name(&self) -> &str {
        "copy"
    }

    fn supported_pixel_formats(&self) -> &[PixelFormat] {
        &[]
    }

    fn open(&self, config: &EncoderConfig) -> Result<Box<dyn Encoder>> {
        if config.width == 0 || config.height == 0 {
            return Err(CodecError::EncoderConfig(format!(
                "invalid dimensions {}x{}",
                config.width, config.height
            ))
            .into());
        }

        let mut parameters = StreamParameters::video(
            self.codec_id.clone(),
            config.width,
            config.height,
            config.pixel_format,
        )
        .with_sample_aspect_ratio(config.sample_aspect_ratio);
        if let Some(rate) = config.time_base.as_rational().recip() {
            parameters = parameters.with_frame_rate(rate);
        }

        Ok(Box::new(CopyEncoder {
            parameters,
            time_base: config.time_base,
            delay: self.delay,
            queue: VecDeque::new(),
            frames_in: 0,
            flushed: false,
        }))
    }
}

struct CopyDecoder {
    width: u32,
    height: u32,
    format: PixelFormat,
    time_base: TimeBase,
    queue: VecDeque<Frame>,
    flushed: bool,
}

impl Decoder for CopyDecoder {
    fn send(&mut self, packet: Option<Packet>) -> Result<()> {
        if self.flushed {
            return Err(CodecError::AlreadyFlushed.into());
        }
        let Some(packet) = packet else {
            self.flushed = true;
            return Ok(());
        };

        let tb = self.time_base;
        let pts = packet.pts.relabel(tb);
        let best_effort = if pts.is_valid() { pts } else { packet.dts.relabel(tb) };
        let duration = Duration::new(packet.duration.value, tb);
        let picture_kind = if packet.is_keyframe() {
            PictureKind::Keyframe
        } else {
            PictureKind::Normal
        };

        let buffer = FrameBuffer::from_payload(self.width, self.height, self.format, packet.into_data());
        let mut frame = Frame::from_buffer(buffer, tb);
        frame.pts = pts;
        frame.best_effort_timestamp = best_effort;
        frame.duration = duration;
        frame.picture_kind = picture_kind;

        self.queue.push_back(frame);
        Ok(())
    }

    fn receive(&mut self) -> Result<Receive<Frame>> {
        match self.queue.pop_front() {
            Some(frame) => Ok(Receive::Ready(frame)),
            None if self.flushed => Ok(Receive::Drained),
            None => Ok(Receive::NeedsMoreInput),
        }
    }
}

struct CopyEncoder {
    parameters: StreamParameters,
    time_base: TimeBase,
    delay: usize,
    queue: VecDeque<Packet>,
    frames_in: u64,
    flushed: bool,
}

impl Encoder for CopyEncoder {
    fn time_base(&self) -> TimeBase {
        self.time_base
    }

    fn parameters(&self) -> &StreamParameters {
        &self.parameters
    }

    fn has_delay(&self) -> bool {
        self.delay > 0
    }

    fn send(&mut self, frame: Option<Frame>) -> Result<()> {
        if self.flushed {
            return Err(CodecError::AlreadyFlushed.into());
        }
        let Some(frame) = frame else {
            trace!(buffered = self.queue.len(), "Copy encoder flushing");
            self.flushed = true;
            return Ok(());
        };

        let tb = self.time_base;
        let pts = Timestamp::new(frame.pts.value, tb);
        let duration = Duration::new(frame.duration.value, tb);
        let keyframe = self.frames_in == 0 || frame.is_keyframe();
        self.frames_in += 1;

        let mut packet = Packet::new(frame.into_buffer().into_payload())
            .with_timestamps(pts, pts)
            .with_duration(duration);
        packet.set_keyframe(keyframe);

        self.queue.push_back(packet);
        Ok(())
    }

    fn receive(&mut self) -> Result<Receive<Packet>> {
        if self.queue.len() > self.delay || (self.flushed && !self.queue.is_empty()) {
            if let Some(packet) = self.queue.pop_front() {
                return Ok(Receive::Ready(packet));
            }
        }
        if self.flushed {
            Ok(Receive::Drained)
        } else {
            Ok(Receive::NeedsMoreInput)
        }
    }
}
