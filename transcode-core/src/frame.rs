//! Decoded video frame abstractions.
//!
//! A [`Frame`] is what a decoder or filter graph hands to the next stage: raw
//! pixel planes plus the timing needed to encode them again.

use crate::timestamp::{Duration, TimeBase, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel format for video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp (1 Cr & Cb sample per 2x2 Y samples).
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp (1 Cr & Cb sample per 2x1 Y samples).
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp (no subsampling).
    Yuv444p,
    /// Planar YUV 4:2:2, full (JPEG) range.
    Yuvj422p,
    /// Planar YUV 4:2:0, 15bpp, 10-bit.
    Yuv420p10le,
    /// Packed NV12 (Y plane, interleaved UV plane).
    Nv12,
    /// Packed RGB24, 24bpp.
    Rgb24,
    /// Packed RGBA, 32bpp.
    Rgba,
    /// Grayscale, 8bpp.
    Gray8,
}

impl PixelFormat {
    /// Get the number of planes for this pixel format.
    pub fn num_planes(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Yuvj422p | Self::Yuv420p10le => 3,
            Self::Nv12 => 2,
            Self::Rgb24 | Self::Rgba | Self::Gray8 => 1,
        }
    }

    /// Bytes per sample of a single component.
    fn bytes_per_sample(&self) -> usize {
        if matches!(self, Self::Yuv420p10le) { 2 } else { 1 }
    }

    /// Get chroma subsampling factors (horizontal, vertical).
    pub fn chroma_subsampling(&self) -> (u32, u32) {
        match self {
            Self::Yuv420p | Self::Yuv420p10le | Self::Nv12 => (2, 2),
            Self::Yuv422p | Self::Yuvj422p => (2, 1),
            _ => (1, 1),
        }
    }

    /// Row length in bytes and row count of one plane.
    fn plane_geometry(&self, plane: usize, width: u32, height: u32) -> (usize, usize) {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Rgb24 => (w * 3, h),
            Self::Rgba => (w * 4, h),
            Self::Gray8 => (w, h),
            Self::Nv12 if plane == 0 => (w, h),
            Self::Nv12 => (w, h / 2),
            _ if plane == 0 => (w * self.bytes_per_sample(), h),
            _ => {
                let (hsub, vsub) = self.chroma_subsampling();
                (
                    w / hsub as usize * self.bytes_per_sample(),
                    h / vsub as usize,
                )
            }
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuv420p => write!(f, "yuv420p"),
            Self::Yuv422p => write!(f, "yuv422p"),
            Self::Yuv444p => write!(f, "yuv444p"),
            Self::Yuvj422p => write!(f, "yuvj422p"),
            Self::Yuv420p10le => write!(f, "yuv420p10le"),
            Self::Nv12 => write!(f, "nv12"),
            Self::Rgb24 => write!(f, "rgb24"),
            Self::Rgba => write!(f, "rgba"),
            Self::Gray8 => write!(f, "gray8"),
        }
    }
}

/// Picture type hint carried by a frame.
///
/// Decoders report what they saw; encoders treat `Keyframe` as a request to
/// start a new group of pictures. Frames leaving a filter graph carry `None`
/// so the encoder chooses picture types on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PictureKind {
    /// No hint.
    #[default]
    None,
    /// Intra-coded picture.
    Keyframe,
    /// Any other picture.
    Normal,
}

/// A decoded video frame.
#[derive(Clone)]
pub struct Frame {
    /// Frame data buffer.
    buffer: FrameBuffer,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// The decoder's best guess at the presentation time.
    ///
    /// Differs from `pts` when the bitstream carries no or reordered
    /// timestamps (B-frames, raw streams).
    pub best_effort_timestamp: Timestamp,
    /// Frame duration.
    pub duration: Duration,
    /// Picture type hint.
    pub picture_kind: PictureKind,
}

impl Frame {
    /// Create a new zeroed frame.
    pub fn new(width: u32, height: u32, format: PixelFormat, time_base: TimeBase) -> Self {
        Self::from_buffer(FrameBuffer::new(width, height, format), time_base)
    }

    /// Create a frame from an existing buffer.
    pub fn from_buffer(buffer: FrameBuffer, time_base: TimeBase) -> Self {
        Self {
            buffer,
            pts: Timestamp::none(time_base),
            best_effort_timestamp: Timestamp::none(time_base),
            duration: Duration::zero(time_base),
            picture_kind: PictureKind::None,
        }
    }

    /// Time base the frame's timestamps are counted in.
    pub fn time_base(&self) -> TimeBase {
        self.pts.time_base
    }

    /// Label all timestamps with a new time base without changing their values.
    pub fn set_time_base(&mut self, time_base: TimeBase) {
        self.pts = self.pts.relabel(time_base);
        self.best_effort_timestamp = self.best_effort_timestamp.relabel(time_base);
        self.duration = self.duration.relabel(time_base);
    }

    /// Convert all timestamps to another time base, rounding to nearest.
    pub fn rescale(&mut self, target: TimeBase) {
        let source = self.time_base();
        self.pts = self.pts.rescale(target);
        self.best_effort_timestamp = self.best_effort_timestamp.rescale(target);
        self.duration = self.duration.rescale_with(source, target);
    }

    /// Get the frame width.
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    /// Get the frame height.
    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    /// Get the pixel format.
    pub fn format(&self) -> PixelFormat {
        self.buffer.format
    }

    /// Check if the decoder marked this frame as a keyframe.
    pub fn is_keyframe(&self) -> bool {
        self.picture_kind == PictureKind::Keyframe
    }

    /// Get the frame buffer.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Take the frame buffer.
    pub fn into_buffer(self) -> FrameBuffer {
        self.buffer
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.buffer.plane(index)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .field("pts", &self.pts.get())
            .field("time_base", &self.time_base())
            .field("picture_kind", &self.picture_kind)
            .finish()
    }
}

/// A buffer for storing frame pixel data.
#[derive(Clone)]
pub struct FrameBuffer {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Plane data.
    planes: Vec<PlaneData>,
}

#[derive(Clone)]
struct PlaneData {
    data: Vec<u8>,
    stride: usize,
}

impl FrameBuffer {
    /// Create a new zeroed frame buffer with 32-byte aligned strides.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let planes = (0..format.num_planes())
            .map(|plane| {
                let (row, rows) = format.plane_geometry(plane, width, height);
                let stride = (row + 31) & !31;
                PlaneData {
                    data: vec![0u8; stride * rows],
                    stride,
                }
            })
            .collect();

        Self {
            width,
            height,
            format,
            planes,
        }
    }

    /// Wrap an opaque payload as a single packed plane.
    ///
    /// Used by passthrough codecs that carry compressed bytes through the
    /// raw-frame stages untouched.
    pub fn from_payload(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        let stride = if height == 0 { data.len() } else { data.len() / height as usize };
        Self {
            width,
            height,
            format,
            planes: vec![PlaneData { data, stride }],
        }
    }

    /// Concatenate all planes into one byte vector.
    pub fn into_payload(self) -> Vec<u8> {
        let mut planes = self.planes.into_iter();
        let mut payload = planes.next().map(|p| p.data).unwrap_or_default();
        for plane in planes {
            payload.extend_from_slice(&plane.data);
        }
        payload
    }

    /// Get the number of planes.
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(|p| p.data.as_slice())
    }

    /// Get the stride for a plane.
    pub fn stride(&self, plane: usize) -> usize {
        self.planes.get(plane).map(|p| p.stride).unwrap_or(0)
    }

    /// Get the total size of all planes in bytes.
    pub fn total_size(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("planes", &self.planes.len())
            .finish()
    }
}
