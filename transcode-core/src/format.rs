//! Container, codec and media kind identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Container format type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ContainerFormat {
    /// ISO Base Media File Format (MP4, M4V, M4A).
    Mp4,
    /// Matroska container.
    Mkv,
    /// WebM (Matroska subset for web).
    WebM,
    /// MPEG Transport Stream.
    MpegTs,
    /// Flash Video (legacy).
    Flv,
    /// QuickTime Movie.
    Mov,
    /// Raw bitstream (no container).
    Raw,
}

impl ContainerFormat {
    /// Get the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::WebM => "webm",
            Self::MpegTs => "ts",
            Self::Flv => "flv",
            Self::Mov => "mov",
            Self::Raw => "raw",
        }
    }

    /// Try to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp4" | "m4v" | "m4a" => Some(Self::Mp4),
            "mkv" => Some(Self::Mkv),
            "webm" => Some(Self::WebM),
            "ts" | "mts" | "m2ts" => Some(Self::MpegTs),
            "flv" => Some(Self::Flv),
            "mov" => Some(Self::Mov),
            "raw" | "yuv" | "h264" | "264" | "ivf" => Some(Self::Raw),
            _ => None,
        }
    }

    /// Guess the format from a destination path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether codec configuration must be stored once in the container header
    /// instead of in-band with each keyframe.
    pub fn requires_global_header(&self) -> bool {
        matches!(self, Self::Mp4 | Self::Mov | Self::Mkv | Self::WebM | Self::Flv)
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mp4 => write!(f, "MP4"),
            Self::Mkv => write!(f, "Matroska"),
            Self::WebM => write!(f, "WebM"),
            Self::MpegTs => write!(f, "MPEG-TS"),
            Self::Flv => write!(f, "FLV"),
            Self::Mov => write!(f, "QuickTime"),
            Self::Raw => write!(f, "Raw"),
        }
    }
}

/// Kind of media carried by an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Video stream.
    Video,
    /// Audio stream.
    Audio,
    /// Subtitle stream.
    Subtitle,
    /// Data stream.
    Data,
    /// Unknown stream type.
    Unknown,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
            Self::Data => write!(f, "data"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Codec identifier.
///
/// Serialized as its short name (`"h264"`, `"vp9"`, ...); names this library
/// does not know are kept in [`CodecId::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CodecId {
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    H265,
    /// VP8.
    Vp8,
    /// VP9.
    Vp9,
    /// AV1.
    Av1,
    /// MJPEG.
    Mjpeg,
    /// Raw video (uncompressed).
    RawVideo,
    /// AAC.
    Aac,
    /// Opus.
    Opus,
    /// Vorbis.
    Vorbis,
    /// FLAC.
    Flac,
    /// WebVTT subtitles.
    WebVtt,
    /// Any other codec, by name.
    Other(String),
}

impl CodecId {
    /// Short codec name.
    pub fn name(&self) -> &str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::Mjpeg => "mjpeg",
            Self::RawVideo => "rawvideo",
            Self::Aac => "aac",
            Self::Opus => "opus",
            Self::Vorbis => "vorbis",
            Self::Flac => "flac",
            Self::WebVtt => "webvtt",
            Self::Other(name) => name,
        }
    }

    /// Look up a codec by short name.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "h264" | "avc" | "libx264" | "libopenh264" => Self::H264,
            "hevc" | "h265" | "libx265" => Self::H265,
            "vp8" | "libvpx" => Self::Vp8,
            "vp9" | "libvpx-vp9" => Self::Vp9,
            "av1" | "libaom-av1" => Self::Av1,
            "mjpeg" => Self::Mjpeg,
            "rawvideo" => Self::RawVideo,
            "aac" => Self::Aac,
            "opus" | "libopus" => Self::Opus,
            "vorbis" | "libvorbis" => Self::Vorbis,
            "flac" => Self::Flac,
            "webvtt" => Self::WebVtt,
            other => Self::Other(other.to_string()),
        }
    }

    /// Media kind this codec produces, when known.
    pub fn media_kind(&self) -> MediaKind {
        match self {
            Self::H264 | Self::H265 | Self::Vp8 | Self::Vp9 | Self::Av1 | Self::Mjpeg | Self::RawVideo => {
                MediaKind::Video
            }
            Self::Aac | Self::Opus | Self::Vorbis | Self::Flac => MediaKind::Audio,
            Self::WebVtt => MediaKind::Subtitle,
            Self::Other(_) => MediaKind::Unknown,
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for CodecId {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<CodecId> for String {
    fn from(id: CodecId) -> Self {
        id.name().to_string()
    }
}
