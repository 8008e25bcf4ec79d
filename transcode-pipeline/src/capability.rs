//! Capability contracts the pipeline drives.
//!
//! Demuxers, decoders, filter graphs, encoders and muxers live outside this
//! crate; the pipeline only sees them through these traits. Every method
//! reports failures with [`transcode_core::Error`]; the pipeline adds the
//! stage and operation when it propagates them.
//!
//! Decoders, encoders and filter graphs share a push/pull protocol: `send`
//! (or `push`) hands over one unit of input, or `None` to start flushing, and
//! `receive` (or `pull`) is called until it stops returning
//! [`Receive::Ready`].

use std::collections::BTreeMap;
use std::path::Path;
use transcode_core::{
    CodecId, ContainerFormat, Frame, MediaKind, Packet, PixelFormat, Rational, Result, TimeBase,
};

/// Result of pulling from a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receive<T> {
    /// One unit of output.
    Ready(T),
    /// Nothing more until more input is sent.
    NeedsMoreInput,
    /// The stage has been flushed and will produce nothing more.
    Drained,
}

impl<T> Receive<T> {
    /// Get the ready value, if any.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Codec parameters of an elementary stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParameters {
    /// Codec identifier.
    pub codec_id: CodecId,
    /// Media kind.
    pub kind: MediaKind,
    /// Width in pixels (video).
    pub width: u32,
    /// Height in pixels (video).
    pub height: u32,
    /// Pixel format (video).
    pub pixel_format: Option<PixelFormat>,
    /// Sample aspect ratio; zero when unknown.
    pub sample_aspect_ratio: Rational,
    /// Average frame rate, if known.
    pub frame_rate: Option<Rational>,
    /// Codec-specific extra data.
    pub extra_data: Option<Vec<u8>>,
}

impl StreamParameters {
    /// Parameters of a video stream.
    pub fn video(codec_id: CodecId, width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            codec_id,
            kind: MediaKind::Video,
            width,
            height,
            pixel_format: Some(pixel_format),
            sample_aspect_ratio: Rational::new(1, 1),
            frame_rate: None,
            extra_data: None,
        }
    }

    /// Parameters of a non-video stream.
    pub fn other(codec_id: CodecId, kind: MediaKind) -> Self {
        Self {
            codec_id,
            kind,
            width: 0,
            height: 0,
            pixel_format: None,
            sample_aspect_ratio: Rational::zero(),
            frame_rate: None,
            extra_data: None,
        }
    }

    /// Set the frame rate.
    #[must_use]
    pub fn with_frame_rate(mut self, rate: Rational) -> Self {
        self.frame_rate = Some(rate);
        self
    }

    /// Set the sample aspect ratio.
    #[must_use]
    pub fn with_sample_aspect_ratio(mut self, sar: Rational) -> Self {
        self.sample_aspect_ratio = sar;
        self
    }
}

/// An input stream as described by the demuxer.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    /// Stream index within the input.
    pub index: usize,
    /// Time base of the stream's packet timestamps.
    pub time_base: TimeBase,
    /// Codec parameters.
    pub parameters: StreamParameters,
}

impl StreamInfo {
    /// Media kind of the stream.
    pub fn kind(&self) -> MediaKind {
        self.parameters.kind
    }

    /// Codec of the stream.
    pub fn codec_id(&self) -> &CodecId {
        &self.parameters.codec_id
    }
}

/// Reads packets from an input container.
pub trait Demuxer: Send {
    /// Get format name.
    fn format_name(&self) -> &str;

    /// Number of elementary streams.
    fn num_streams(&self) -> usize;

    /// Describe one stream.
    fn stream(&self, index: usize) -> Option<&StreamInfo>;

    /// Read the next packet, or `None` at end of input.
    ///
    /// Packet timestamps are counted in the time base of the packet's stream.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/// Turns packets into frames.
pub trait Decoder: Send {
    /// Send one packet, or `None` to start flushing.
    fn send(&mut self, packet: Option<Packet>) -> Result<()>;

    /// Pull the next decoded frame.
    fn receive(&mut self) -> Result<Receive<Frame>>;
}

/// Turns frames into packets.
pub trait Encoder: Send {
    /// Time base of the encoder's frame and packet timestamps.
    fn time_base(&self) -> TimeBase;

    /// Parameters of the encoded stream, used to create the output stream.
    fn parameters(&self) -> &StreamParameters;

    /// Whether the encoder may hold frames back until flushed.
    fn has_delay(&self) -> bool;

    /// Send one frame, or `None` to start flushing.
    fn send(&mut self, frame: Option<Frame>) -> Result<()>;

    /// Pull the next encoded packet.
    fn receive(&mut self) -> Result<Receive<Packet>>;
}

/// A configured filter graph.
pub trait FilterGraph: Send {
    /// Time base of the frames leaving the graph.
    fn output_time_base(&self) -> TimeBase;

    /// Push one frame, or `None` to signal end of input.
    fn push(&mut self, frame: Option<Frame>) -> Result<()>;

    /// Pull the next filtered frame. `Drained` means the graph is exhausted.
    fn pull(&mut self) -> Result<Receive<Frame>>;
}

/// Writes packets to an output container.
pub trait Muxer: Send {
    /// Get format name.
    fn format_name(&self) -> &str;

    /// Whether codecs must place their configuration in the container header.
    fn requires_global_header(&self) -> bool;

    /// Add an output stream and return its index.
    fn add_stream(&mut self, parameters: &StreamParameters, time_base: TimeBase) -> Result<usize>;

    /// Write the container header.
    fn write_header(&mut self, options: &BTreeMap<String, String>) -> Result<()>;

    /// Time base the container settled on for a stream.
    ///
    /// May differ from the one requested in `add_stream` once the header has
    /// been written.
    fn stream_time_base(&self, index: usize) -> Option<TimeBase>;

    /// Write one packet, interleaving it with packets of other streams.
    fn write_interleaved_packet(&mut self, packet: Packet) -> Result<()>;

    /// Write the container trailer.
    fn write_trailer(&mut self) -> Result<()>;
}

/// Everything an encoder needs to be opened.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    /// Target codec.
    pub codec_id: CodecId,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Sample aspect ratio.
    pub sample_aspect_ratio: Rational,
    /// Pixel format of the frames that will be sent.
    pub pixel_format: PixelFormat,
    /// Time base of the frames that will be sent.
    pub time_base: TimeBase,
    /// Place codec configuration in extra data instead of in-band.
    pub global_header: bool,
    /// Encoder private options (e.g. `crf`).
    pub options: BTreeMap<String, String>,
}

/// Description of the frames entering a filter graph.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterInput {
    /// Media kind.
    pub kind: MediaKind,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub pixel_format: PixelFormat,
    /// Time base of the incoming frames.
    pub time_base: TimeBase,
    /// Sample aspect ratio.
    pub sample_aspect_ratio: Rational,
}

/// Constraints on the frames leaving a filter graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOutputHint {
    /// Pixel format the encoder expects.
    pub pixel_format: PixelFormat,
}

/// Opens decoders for one or more codecs.
pub trait DecoderFactory: Send + Sync {
    /// Factory name.
    fn name(&self) -> &str;

    /// Open a decoder for an input stream.
    fn open(&self, stream: &StreamInfo) -> Result<Box<dyn Decoder>>;
}

/// Opens encoders for one or more codecs.
pub trait EncoderFactory: Send + Sync {
    /// Factory name.
    fn name(&self) -> &str;

    /// Pixel formats the encoder accepts, preferred first. Empty if any.
    fn supported_pixel_formats(&self) -> &[PixelFormat];

    /// Open an encoder.
    fn open(&self, config: &EncoderConfig) -> Result<Box<dyn Encoder>>;
}

/// Builds filter graphs from a textual description.
pub trait FilterGraphBuilder: Send + Sync {
    /// Build and configure a graph.
    fn configure(
        &self,
        spec: &str,
        input: &FilterInput,
        hint: &FilterOutputHint,
    ) -> Result<Box<dyn FilterGraph>>;
}

/// Opens input containers.
pub trait InputFormat: Send + Sync {
    /// Format name.
    fn name(&self) -> &str;

    /// Whether this format can read the given source.
    fn probe(&self, source: &Path) -> bool;

    /// Open a source for reading.
    fn open(&self, source: &Path) -> Result<Box<dyn Demuxer>>;
}

/// Opens output containers.
pub trait OutputFormat: Send + Sync {
    /// Format name.
    fn name(&self) -> &str;

    /// Whether this format writes the given container.
    fn accepts(&self, container: ContainerFormat) -> bool;

    /// Create a destination for writing.
    fn open(&self, destination: &Path, container: Option<ContainerFormat>) -> Result<Box<dyn Muxer>>;
}
