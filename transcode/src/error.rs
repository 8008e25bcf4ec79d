//! Error type for the high-level API.

use thiserror::Error;
use transcode_pipeline::PipelineError;

/// Errors returned by [`Transcoder`](crate::Transcoder).
#[derive(Error, Debug)]
pub enum Error {
    /// Failure in a core type or capability.
    #[error(transparent)]
    Core(#[from] transcode_core::Error),

    /// Failure while opening or running the pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Filesystem error around the input or output path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid options.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The pipeline error, if that is what failed.
    pub fn as_pipeline(&self) -> Option<&PipelineError> {
        match self {
            Self::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for the high-level API.
pub type Result<T> = std::result::Result<T, Error>;
