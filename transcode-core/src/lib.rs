//! # Transcode Core
//!
//! Core types shared by every Transcode component:
//! - Error handling types
//! - Rational numbers and time base rescaling
//! - Packet and timestamp management
//! - Frame buffer abstractions
//! - Container and codec identifiers

pub mod error;
pub mod format;
pub mod frame;
pub mod packet;
pub mod rational;
pub mod timestamp;

pub use error::{CodecError, ContainerError, Error, Result};
pub use format::{CodecId, ContainerFormat, MediaKind};
pub use frame::{Frame, FrameBuffer, PictureKind, PixelFormat};
pub use packet::{Packet, PacketFlags};
pub use rational::{Rational, Rounding};
pub use timestamp::{Duration, RescaleMode, TimeBase, Timestamp};
