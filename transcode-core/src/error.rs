//! Error types shared by the core types and by capability implementations.
//!
//! Decoders, encoders, filter graphs, demuxers and muxers report failures with
//! [`Error`]; the pipeline wraps them with the stage and operation that failed.

use thiserror::Error;

/// Main error type for the Transcode library.
#[derive(Error, Debug)]
pub enum Error {
    /// Container format errors (demuxing/muxing).
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// Codec errors (encoding/decoding).
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unsupported feature or format.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Container format errors.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Unknown or unsupported container format.
    #[error("Unknown container format")]
    UnknownFormat,

    /// Stream not found in container.
    #[error("Stream {index} not found")]
    StreamNotFound { index: u32 },

    /// Header has not been written yet.
    #[error("Header not written")]
    HeaderNotWritten,

    /// Generic container error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for ContainerError {
    fn from(s: String) -> Self {
        ContainerError::Other(s)
    }
}

impl From<&str> for ContainerError {
    fn from(s: &str) -> Self {
        ContainerError::Other(s.to_string())
    }
}

/// Codec errors.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Codec used before it was opened or after it was drained.
    #[error("Codec not initialized")]
    NotInitialized,

    /// Input sent after the end-of-stream sentinel.
    #[error("Input sent after end of stream")]
    AlreadyFlushed,

    /// Encoder configuration error.
    #[error("Encoder configuration error: {0}")]
    EncoderConfig(String),

    /// Generic codec error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for CodecError {
    fn from(s: String) -> Self {
        CodecError::Other(s)
    }
}

impl From<&str> for CodecError {
    fn from(s: &str) -> Self {
        CodecError::Other(s.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }
}
