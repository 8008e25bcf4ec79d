//! High-level transcoder API.

use crate::error::{Error, Result};
use crate::options::TranscodeOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use transcode_pipeline::{Pipeline, PipelineState, Registry, TranscodeStats};

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&TranscodeStats) + Send>;

/// High-level transcoder: opens the files named in its options through a
/// [`Registry`] and runs a [`Pipeline`] over them.
pub struct Transcoder {
    /// Transcoding options.
    options: TranscodeOptions,
    /// Codecs and formats.
    registry: Arc<Registry>,
    /// Progress callback.
    progress_callback: Option<ProgressCallback>,
    /// Statistics of the last run.
    stats: TranscodeStats,
    state: PipelineState,
}

impl Transcoder {
    /// Create a new transcoder with the given options.
    pub fn new(options: TranscodeOptions, registry: Arc<Registry>) -> Result<Self> {
        options.validate().map_err(Error::Config)?;

        Ok(Self {
            options,
            registry,
            progress_callback: None,
            stats: TranscodeStats::default(),
            state: PipelineState::Idle,
        })
    }

    /// Set progress callback, called after every packet read.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TranscodeStats) + Send + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Get current statistics.
    pub fn stats(&self) -> &TranscodeStats {
        &self.stats
    }

    /// Get the options.
    pub fn options(&self) -> &TranscodeOptions {
        &self.options
    }

    /// State the pipeline ended in.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn paths(&self) -> Result<(PathBuf, PathBuf)> {
        let input = self
            .options
            .input
            .clone()
            .ok_or_else(|| Error::Config("No input specified".into()))?;
        let output = self
            .options
            .output
            .clone()
            .ok_or_else(|| Error::Config("No output specified".into()))?;
        Ok((input, output))
    }

    /// Run the transcoding process.
    ///
    /// The input is classified before the output is touched, so an input the
    /// pipeline cannot handle never leaves an output file behind. Failures
    /// after the output header was written leave a finalized partial file.
    pub fn run(&mut self) -> Result<TranscodeStats> {
        let (input_path, output_path) = self.paths()?;
        info!("Starting transcode: {:?} -> {:?}", input_path, output_path);

        // Check if output exists and overwrite is disabled
        if output_path.exists() && !self.options.overwrite {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("Output file already exists: {:?}", output_path),
            )));
        }

        let mut pipeline = Pipeline::new(self.options.pipeline.clone(), Arc::clone(&self.registry));
        let result = self.drive(&mut pipeline, &input_path, &output_path);
        if result.is_err() {
            pipeline.abort();
        }
        self.stats = pipeline.stats().clone();
        self.state = pipeline.state();
        result?;

        if let Ok(metadata) = std::fs::metadata(&output_path) {
            debug!(bytes = metadata.len(), "Output size");
        }
        info!(
            "Transcode complete: {} packets written ({} during flush)",
            self.stats.packets_written, self.stats.flush_packets_written
        );

        Ok(self.stats.clone())
    }

    fn drive(&self, pipeline: &mut Pipeline, input_path: &Path, output_path: &Path) -> Result<()> {
        let demuxer = self.registry.open_input(input_path)?;
        pipeline.open_input(demuxer)?;

        // Create output directory if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let muxer = self.registry.open_output(output_path, self.options.container)?;
        pipeline.open_output(muxer)?;
        pipeline.configure_filters()?;

        while pipeline.step()? {
            if let Some(ref callback) = self.progress_callback {
                callback(pipeline.stats());
            }
        }

        pipeline.flush()?;
        pipeline.finalize()?;
        Ok(())
    }
}
