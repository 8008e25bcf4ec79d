//! # Transcode
//!
//! Transcode the single stream of a media file into another codec.
//!
//! The input is demuxed, decoded, passed through a filter graph, re-encoded
//! and muxed into the output container, with timestamps converted between
//! the time bases of each stage. Codecs, containers and filter graphs are
//! supplied through a [`Registry`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use transcode::{CodecId, Registry, Transcoder, TranscodeOptions};
//!
//! fn main() -> transcode::Result<()> {
//!     transcode::init_logging(false);
//!
//!     let mut registry = Registry::new();
//!     registry.register_copy(CodecId::H264, 0);
//!     // register input/output formats and a VP9 encoder here
//!
//!     let options = TranscodeOptions::new()
//!         .input("input.mp4")
//!         .output("output.webm")
//!         .encoder(CodecId::Vp9)
//!         .encoder_option("crf", "20");
//!
//!     let mut transcoder = Transcoder::new(options, Arc::new(registry))?;
//!     let stats = transcoder.run()?;
//!     println!("{} packets written", stats.packets_written);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - `transcode-core`: timestamps, time bases, frames, packets and errors
//! - `transcode-pipeline`: capability traits, registry and the pipeline
//!
//! This crate re-exports the most commonly used types and provides a
//! high-level API for simple use cases.

mod error;
mod options;
pub mod prelude;
mod transcoder;

// Re-export core types
pub use transcode_core::{
    CodecId, ContainerFormat, Duration, Frame, FrameBuffer, MediaKind, Packet, PacketFlags,
    PictureKind, PixelFormat, Rational, TimeBase, Timestamp,
};

// Re-export pipeline types
pub use transcode_pipeline::{
    Decoder, DecoderFactory, Demuxer, Encoder, EncoderConfig, EncoderFactory, FilterGraph,
    FilterGraphBuilder, InputFormat, Muxer, OutputFormat, Pipeline, PipelineConfig, PipelineError,
    PipelineState, Receive, Registry, StreamInfo, StreamParameters, StreamSelection,
    TranscodeStats, UnselectedStreams,
};

// High-level API
pub use error::{Error, Result};
pub use options::TranscodeOptions;
pub use transcoder::{ProgressCallback, Transcoder};

use tracing_subscriber::EnvFilter;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string.
pub fn version() -> &'static str {
    VERSION
}

/// Install a global `tracing` subscriber printing to stderr.
///
/// Filtering follows `RUST_LOG` when it is set; otherwise logs at INFO, or
/// DEBUG when `verbose` is set. Does nothing if a global subscriber is
/// already installed.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn default_log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}
