//! Pipeline configuration.

use crate::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use transcode_core::{CodecId, TimeBase};

/// Which input stream is transcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSelection {
    /// The input must contain exactly one stream.
    #[default]
    Single,
    /// Transcode the first video stream; other streams are unselected.
    FirstVideo,
}

/// What happens to packets of streams that are not transcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnselectedStreams {
    /// Discard them.
    #[default]
    Drop,
    /// Copy them into the output untouched.
    Remux,
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target codec of the transcoded stream.
    pub encoder: CodecId,
    /// Encoder private options.
    pub encoder_options: BTreeMap<String, String>,
    /// Encoder time base; derived from the input frame rate when unset.
    pub encoder_time_base: Option<TimeBase>,
    /// Options passed to the muxer when writing the header.
    pub muxer_options: BTreeMap<String, String>,
    /// Filter graph description.
    pub filter: String,
    /// Stream selection policy.
    pub selection: StreamSelection,
    /// Policy for streams that are not transcoded.
    pub unselected: UnselectedStreams,
    /// Log progress every this many packets (0 disables).
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut encoder_options = BTreeMap::new();
        encoder_options.insert("crf".to_string(), "20".to_string());

        Self {
            encoder: CodecId::Vp9,
            encoder_options,
            encoder_time_base: None,
            muxer_options: BTreeMap::new(),
            filter: "null".to_string(),
            selection: StreamSelection::default(),
            unselected: UnselectedStreams::default(),
            progress_interval: 100,
        }
    }
}

impl PipelineConfig {
    /// Create a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target codec.
    #[must_use]
    pub fn encoder(mut self, codec: CodecId) -> Self {
        self.encoder = codec;
        self
    }

    /// Set an encoder option.
    #[must_use]
    pub fn encoder_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.encoder_options.insert(key.into(), value.into());
        self
    }

    /// Override the encoder time base.
    #[must_use]
    pub fn encoder_time_base(mut self, time_base: TimeBase) -> Self {
        self.encoder_time_base = Some(time_base);
        self
    }

    /// Set a muxer option (e.g. `movflags`).
    #[must_use]
    pub fn muxer_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.muxer_options.insert(key.into(), value.into());
        self
    }

    /// Set the filter graph description.
    #[must_use]
    pub fn filter(mut self, spec: impl Into<String>) -> Self {
        self.filter = spec.into();
        self
    }

    /// Set the stream selection policy.
    #[must_use]
    pub fn selection(mut self, selection: StreamSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Set the policy for streams that are not transcoded.
    #[must_use]
    pub fn unselected(mut self, policy: UnselectedStreams) -> Self {
        self.unselected = policy;
        self
    }

    /// Set the progress logging interval.
    #[must_use]
    pub fn progress_interval(mut self, packets: u64) -> Self {
        self.progress_interval = packets;
        self
    }

    /// Check the configuration for values no pipeline can run with.
    pub fn validate(&self) -> Result<()> {
        if self.encoder.name().is_empty() {
            return Err(PipelineError::InvalidConfig("encoder codec name is empty".into()));
        }
        if self.filter.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("filter description is empty".into()));
        }
        if let Some(tb) = self.encoder_time_base {
            if tb.as_rational().num <= 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "encoder time base {} is not positive",
                    tb
                )));
            }
        }
        if let Some(key) = self
            .encoder_options
            .keys()
            .chain(self.muxer_options.keys())
            .find(|k| k.is_empty())
        {
            return Err(PipelineError::InvalidConfig(format!("empty option name '{}'", key)));
        }
        Ok(())
    }
}
