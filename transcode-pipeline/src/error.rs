//! Pipeline error types.

use crate::pipeline::PipelineState;
use std::fmt;
use thiserror::Error;
use transcode_core::error::Error as CoreError;
use transcode_core::CodecId;

/// Stage of the transcode a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Demux,
    Decode,
    Filter,
    Encode,
    Mux,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Demux => write!(f, "demux"),
            Self::Decode => write!(f, "decode"),
            Self::Filter => write!(f, "filter"),
            Self::Encode => write!(f, "encode"),
            Self::Mux => write!(f, "mux"),
        }
    }
}

/// Operation a stage was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageOp {
    Open,
    Read,
    Send,
    Receive,
    Push,
    Pull,
    AddStream,
    WriteHeader,
    WritePacket,
    WriteTrailer,
}

impl fmt::Display for StageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Read => "read",
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::AddStream => "add stream",
            Self::WriteHeader => "write header",
            Self::WritePacket => "write packet",
            Self::WriteTrailer => "write trailer",
        };
        f.write_str(name)
    }
}

/// Pipeline error type.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An input or output could not be opened.
    #[error("Failed to open {target}: {source}")]
    Open {
        stage: Stage,
        target: String,
        #[source]
        source: CoreError,
    },

    /// The input's stream layout cannot be transcoded.
    #[error("Unsupported input: {0}")]
    UnsupportedInputShape(String),

    /// A codec could not be found or opened.
    #[error("Unsupported {stage} codec {codec}: {source}")]
    UnsupportedCodec {
        stage: Stage,
        codec: CodecId,
        #[source]
        source: CoreError,
    },

    /// No decoder is registered for the selected stream's codec.
    #[error("No decoder available for stream {stream} ({codec})")]
    NoDecoderAvailable { stream: usize, codec: CodecId },

    /// Reading from the input failed.
    #[error("Read error: {source}")]
    Read {
        #[source]
        source: CoreError,
    },

    /// The decoder failed.
    #[error("Decode error during {op}: {source}")]
    Decode {
        op: StageOp,
        #[source]
        source: CoreError,
    },

    /// The encoder failed.
    #[error("Encode error during {op}: {source}")]
    Encode {
        op: StageOp,
        #[source]
        source: CoreError,
    },

    /// The filter graph could not be built.
    #[error("Failed to configure filter graph '{spec}': {source}")]
    FilterConfig {
        spec: String,
        #[source]
        source: CoreError,
    },

    /// The filter graph failed while running.
    #[error("Filter error during {op}: {source}")]
    Filter {
        op: StageOp,
        #[source]
        source: CoreError,
    },

    /// The muxer failed.
    #[error("Mux error during {op}: {source}")]
    MuxWrite {
        op: StageOp,
        #[source]
        source: CoreError,
    },

    /// An operation was attempted out of order.
    #[error("Cannot {op} in state {state:?}")]
    InvalidState {
        op: &'static str,
        state: PipelineState,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Wrap a failure reported by a running stage.
    pub fn stage_failure(stage: Stage, op: StageOp, source: CoreError) -> Self {
        match stage {
            Stage::Demux => Self::Read { source },
            Stage::Decode => Self::Decode { op, source },
            Stage::Filter => Self::Filter { op, source },
            Stage::Encode => Self::Encode { op, source },
            Stage::Mux => Self::MuxWrite { op, source },
        }
    }

    /// The stage that failed, if the error is tied to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Open { stage, .. } | Self::UnsupportedCodec { stage, .. } => Some(*stage),
            Self::UnsupportedInputShape(_) | Self::NoDecoderAvailable { .. } | Self::Read { .. } => {
                Some(Stage::Demux)
            }
            Self::Decode { .. } => Some(Stage::Decode),
            Self::Encode { .. } => Some(Stage::Encode),
            Self::FilterConfig { .. } | Self::Filter { .. } => Some(Stage::Filter),
            Self::MuxWrite { .. } => Some(Stage::Mux),
            Self::InvalidState { .. } | Self::InvalidConfig(_) => None,
        }
    }

    /// The operation that failed, for stage errors.
    pub fn op(&self) -> Option<StageOp> {
        match self {
            Self::Open { .. } => Some(StageOp::Open),
            Self::Read { .. } => Some(StageOp::Read),
            Self::Decode { op, .. }
            | Self::Encode { op, .. }
            | Self::Filter { op, .. }
            | Self::MuxWrite { op, .. } => Some(*op),
            _ => None,
        }
    }
}

/// Pipeline result type.
pub type Result<T> = std::result::Result<T, PipelineError>;
