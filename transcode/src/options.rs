//! Transcoding options and configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use transcode_core::{CodecId, ContainerFormat};
use transcode_pipeline::PipelineConfig;

/// High-level transcoding options using builder pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeOptions {
    /// Input file path.
    pub input: Option<PathBuf>,
    /// Output file path.
    pub output: Option<PathBuf>,
    /// Output container; derived from the output extension when unset.
    pub container: Option<ContainerFormat>,
    /// Overwrite output file if exists.
    pub overwrite: bool,
    /// Pipeline configuration.
    pub pipeline: PipelineConfig,
}

impl TranscodeOptions {
    /// Create new transcoding options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set input file path.
    #[must_use]
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    /// Set output file path.
    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Force the output container.
    #[must_use]
    pub fn container(mut self, container: ContainerFormat) -> Self {
        self.container = Some(container);
        self
    }

    /// Set overwrite mode.
    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the target codec.
    #[must_use]
    pub fn encoder(mut self, codec: CodecId) -> Self {
        self.pipeline = self.pipeline.encoder(codec);
        self
    }

    /// Set an encoder option.
    #[must_use]
    pub fn encoder_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pipeline = self.pipeline.encoder_option(key, value);
        self
    }

    /// Set the filter graph description.
    #[must_use]
    pub fn filter(mut self, spec: impl Into<String>) -> Self {
        self.pipeline = self.pipeline.filter(spec);
        self
    }

    /// Replace the whole pipeline configuration.
    #[must_use]
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    /// Validate options.
    pub fn validate(&self) -> Result<(), String> {
        let input = self.input.as_ref().ok_or("Input file not specified")?;
        let output = self.output.as_ref().ok_or("Output file not specified")?;
        if input == output {
            return Err(format!("Input and output are the same file: {}", input.display()));
        }
        if self.container.is_none() && ContainerFormat::from_path(output).is_none() {
            return Err(format!(
                "Cannot infer container from {}; set one explicitly",
                output.display()
            ));
        }
        self.pipeline.validate().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = TranscodeOptions::new()
            .input("in.mkv")
            .output("out.webm")
            .encoder(CodecId::Av1)
            .encoder_option("cpu-used", "8")
            .overwrite(true);

        assert_eq!(options.input, Some(PathBuf::from("in.mkv")));
        assert_eq!(options.pipeline.encoder, CodecId::Av1);
        assert_eq!(
            options.pipeline.encoder_options.get("cpu-used").map(String::as_str),
            Some("8")
        );
        assert!(options.overwrite);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_paths() {
        assert_eq!(
            TranscodeOptions::new().output("out.mp4").validate(),
            Err("Input file not specified".to_string())
        );
        assert_eq!(
            TranscodeOptions::new().input("in.mp4").validate(),
            Err("Output file not specified".to_string())
        );
    }

    #[test]
    fn test_validate_same_file() {
        let options = TranscodeOptions::new().input("a.mp4").output("a.mp4");
        assert!(options.validate().unwrap_err().contains("same file"));
    }

    #[test]
    fn test_validate_container() {
        let options = TranscodeOptions::new().input("in.mp4").output("out.bin");
        assert!(options.validate().is_err());
        assert!(options.container(ContainerFormat::Raw).validate().is_ok());
    }

    #[test]
    fn test_validate_pipeline_config() {
        let options = TranscodeOptions::new().input("in.mp4").output("out.mp4").filter("");
        assert!(options.validate().unwrap_err().contains("filter"));
    }

    #[test]
    fn test_deserialize() {
        let options: TranscodeOptions = serde_json::from_str(
            r#"{"input": "in.mp4", "output": "out.mkv", "pipeline": {"encoder": "h264"}}"#,
        )
        .unwrap();
        assert_eq!(options.output, Some(PathBuf::from("out.mkv")));
        assert_eq!(options.pipeline.encoder, CodecId::H264);
        assert_eq!(options.pipeline.filter, "null");
        assert!(!options.overwrite);
    }
}
