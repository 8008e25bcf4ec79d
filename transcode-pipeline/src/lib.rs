//! Transcoding pipeline for the Transcode codec library.
//!
//! Drives a single input stream through demux, decode, filter, encode and
//! mux, converting timestamps between the time bases of each stage. Codecs,
//! containers and filter graphs are plugged in through the traits in
//! [`capability`] and looked up through a [`Registry`].

pub mod capability;
mod classify;
mod config;
mod copy;
mod error;
mod filter;
mod pipeline;
mod pump;
mod registry;
mod writer;

pub use capability::{
    Decoder, DecoderFactory, Demuxer, Encoder, EncoderConfig, EncoderFactory, FilterGraph,
    FilterGraphBuilder, FilterInput, FilterOutputHint, InputFormat, Muxer, OutputFormat, Receive,
    StreamInfo, StreamParameters,
};
pub use classify::{classify, StreamClass};
pub use config::{PipelineConfig, StreamSelection, UnselectedStreams};
pub use copy::CopyCodec;
pub use error::{PipelineError, Result, Stage, StageOp};
pub use filter::{FilterStage, FilteredFrames, NullFilterGraph, NullGraphBuilder};
pub use pipeline::{Pipeline, PipelineState, RemuxContext, TranscodeStats};
pub use pump::{PumpOutcome, PumpStage, StagePump};
pub use registry::Registry;
pub use writer::OutputWriter;
