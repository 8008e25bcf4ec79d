//! Registry of codecs, filter graph builder and container formats.

use crate::capability::{
    DecoderFactory, Demuxer, EncoderFactory, FilterGraphBuilder, InputFormat, Muxer, OutputFormat,
};
use crate::copy::CopyCodec;
use crate::error::{PipelineError, Result, Stage};
use crate::filter::NullGraphBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};
use transcode_core::error::ContainerError;
use transcode_core::{CodecId, ContainerFormat};

/// Lookup table for everything the pipeline opens by name.
///
/// There is no global registry; each pipeline is handed one.
pub struct Registry {
    decoders: HashMap<CodecId, Box<dyn DecoderFactory>>,
    encoders: HashMap<CodecId, Box<dyn EncoderFactory>>,
    filter_builder: Box<dyn FilterGraphBuilder>,
    input_formats: Vec<Box<dyn InputFormat>>,
    output_formats: Vec<Box<dyn OutputFormat>>,
}

impl Registry {
    /// Create a registry with no codecs or formats and the `null` filter builder.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
            encoders: HashMap::new(),
            filter_builder: Box::new(NullGraphBuilder),
            input_formats: Vec::new(),
            output_formats: Vec::new(),
        }
    }

    /// Register a decoder factory for a codec, replacing any previous one.
    pub fn register_decoder(&mut self, codec: CodecId, factory: impl DecoderFactory + 'static) {
        info!(codec = %codec, factory = factory.name(), "Decoder registered");
        self.decoders.insert(codec, Box::new(factory));
    }

    /// Register an encoder factory for a codec, replacing any previous one.
    pub fn register_encoder(&mut self, codec: CodecId, factory: impl EncoderFactory + 'static) {
        info!(codec = %codec, factory = factory.name(), "Encoder registered");
        self.encoders.insert(codec, Box::new(factory));
    }

    /// Register the passthrough codec as both decoder and encoder for `codec`.
    pub fn register_copy(&mut self, codec: CodecId, encoder_delay: usize) {
        let copy = CopyCodec::new(codec.clone()).with_delay(encoder_delay);
        self.register_decoder(codec.clone(), copy.clone());
        self.register_encoder(codec, copy);
    }

    /// Replace the filter graph builder.
    pub fn set_filter_builder(&mut self, builder: impl FilterGraphBuilder + 'static) {
        self.filter_builder = Box::new(builder);
    }

    /// Register an input format. Formats are probed in registration order.
    pub fn register_input_format(&mut self, format: impl InputFormat + 'static) {
        info!(format = format.name(), "Input format registered");
        self.input_formats.push(Box::new(format));
    }

    /// Register an output format. Formats are matched in registration order.
    pub fn register_output_format(&mut self, format: impl OutputFormat + 'static) {
        info!(format = format.name(), "Output format registered");
        self.output_formats.push(Box::new(format));
    }

    /// Find the decoder factory for a codec.
    pub fn find_decoder(&self, codec: &CodecId) -> Option<&dyn DecoderFactory> {
        self.decoders.get(codec).map(|f| f.as_ref())
    }

    /// Find the encoder factory for a codec.
    pub fn find_encoder(&self, codec: &CodecId) -> Option<&dyn EncoderFactory> {
        self.encoders.get(codec).map(|f| f.as_ref())
    }

    /// The filter graph builder.
    pub fn filter_builder(&self) -> &dyn FilterGraphBuilder {
        self.filter_builder.as_ref()
    }

    /// Open an input with the first format that recognizes it.
    pub fn open_input(&self, source: &Path) -> Result<Box<dyn Demuxer>> {
        let target = source.display().to_string();
        let format = self
            .input_formats
            .iter()
            .find(|f| f.probe(source))
            .ok_or_else(|| PipelineError::Open {
                stage: Stage::Demux,
                target: target.clone(),
                source: ContainerError::UnknownFormat.into(),
            })?;

        debug!(format = format.name(), source = %target, "Opening input");
        format.open(source).map_err(|source| PipelineError::Open {
            stage: Stage::Demux,
            target,
            source,
        })
    }

    /// Open an output for the given container, or the one implied by the
    /// destination's extension.
    pub fn open_output(
        &self,
        destination: &Path,
        container: Option<ContainerFormat>,
    ) -> Result<Box<dyn Muxer>> {
        let target = destination.display().to_string();
        let unknown = || PipelineError::Open {
            stage: Stage::Mux,
            target: target.clone(),
            source: ContainerError::UnknownFormat.into(),
        };

        let container = container
            .or_else(|| ContainerFormat::from_path(destination))
            .ok_or_else(unknown)?;
        let format = self
            .output_formats
            .iter()
            .find(|f| f.accepts(container))
            .ok_or_else(unknown)?;

        debug!(format = format.name(), container = %container, destination = %target, "Opening output");
        format
            .open(destination, Some(container))
            .map_err(|source| PipelineError::Open {
                stage: Stage::Mux,
                target,
                source,
            })
    }

    /// Number of registered decoders.
    pub fn decoder_count(&self) -> usize {
        self.decoders.len()
    }

    /// Number of registered encoders.
    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
