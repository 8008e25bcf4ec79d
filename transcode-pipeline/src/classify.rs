//! Picks the one input stream that gets transcoded.

use crate::capability::Demuxer;
use crate::config::StreamSelection;
use crate::error::{PipelineError, Result};
use crate::registry::Registry;
use tracing::debug;
use transcode_core::{CodecId, MediaKind};

/// Outcome of stream classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamClass {
    /// Index of the selected stream.
    pub index: usize,
    /// Media kind of the selected stream.
    pub kind: MediaKind,
    /// Codec of the selected stream.
    pub codec_id: CodecId,
    /// Every other stream, in input order.
    pub unselected: Vec<usize>,
}

/// Select the stream to transcode.
///
/// Under [`StreamSelection::Single`] the input must hold exactly one stream.
/// Under [`StreamSelection::FirstVideo`] the first video stream wins and the
/// rest are reported as unselected. The selected stream must have a known
/// media kind and a registered decoder.
pub fn classify(
    demuxer: &dyn Demuxer,
    registry: &Registry,
    selection: StreamSelection,
) -> Result<StreamClass> {
    let count = demuxer.num_streams();
    if count == 0 {
        return Err(PipelineError::UnsupportedInputShape("input has no streams".into()));
    }

    let index = match selection {
        StreamSelection::Single if count > 1 => {
            return Err(PipelineError::UnsupportedInputShape(format!(
                "expected exactly one stream, found {}",
                count
            )));
        }
        StreamSelection::Single => 0,
        StreamSelection::FirstVideo => (0..count)
            .find(|&i| demuxer.stream(i).map(|s| s.kind()) == Some(MediaKind::Video))
            .ok_or_else(|| PipelineError::UnsupportedInputShape("input has no video stream".into()))?,
    };

    let stream = demuxer.stream(index).ok_or_else(|| {
        PipelineError::UnsupportedInputShape(format!("stream {} is not described by the input", index))
    })?;

    let kind = stream.kind();
    if kind == MediaKind::Unknown {
        return Err(PipelineError::UnsupportedInputShape(format!(
            "elementary stream {} is of unknown type",
            index
        )));
    }

    let codec_id = stream.codec_id().clone();
    if registry.find_decoder(&codec_id).is_none() {
        return Err(PipelineError::NoDecoderAvailable {
            stream: index,
            codec: codec_id,
        });
    }

    let unselected: Vec<usize> = (0..count).filter(|&i| i != index).collect();
    debug!(stream = index, kind = %kind, codec = %codec_id, unselected = unselected.len(), "Stream classified");

    Ok(StreamClass {
        index,
        kind,
        codec_id,
        unselected,
    })
}
