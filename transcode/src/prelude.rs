//! Prelude module for convenient imports.
//!
//! ```rust
//! use transcode::prelude::*;
//! ```

// Error types
pub use crate::{Error, Result};

// Media types
pub use crate::{Frame, Packet, PixelFormat};
pub use crate::{Duration, Rational, TimeBase, Timestamp};
pub use crate::{CodecId, ContainerFormat, MediaKind};

// Capability traits
pub use crate::{Decoder, DecoderFactory, Demuxer, Encoder, EncoderFactory};
pub use crate::{FilterGraph, FilterGraphBuilder, InputFormat, Muxer, OutputFormat};

// Pipeline types
pub use crate::{Pipeline, PipelineConfig, PipelineState, Registry};

// High-level API
pub use crate::{TranscodeOptions, TranscodeStats, Transcoder};
