//! Packet abstractions for encoded media data.
//!
//! Packets contain compressed data as read from a container or produced by an
//! encoder. A packet is moved from stage to stage; whoever holds it owns it.

use crate::timestamp::{Duration, TimeBase, Timestamp};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flags for packet properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// This packet contains a keyframe.
        const KEYFRAME = 0x0001;
        /// Packet data is corrupted.
        const CORRUPT = 0x0002;
        /// Packet should be discarded.
        const DISCARD = 0x0004;
    }
}

/// An encoded media packet.
#[derive(Clone)]
pub struct Packet {
    /// The packet data.
    data: Vec<u8>,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Decode timestamp.
    pub dts: Timestamp,
    /// Duration of the packet.
    pub duration: Duration,
    /// Stream index this packet belongs to.
    pub stream_index: u32,
    /// Packet flags.
    pub flags: PacketFlags,
}

impl Packet {
    /// Create a new packet with owned data and no timing information.
    pub fn new(data: Vec<u8>) -> Self {
        let time_base = TimeBase::default();
        Self {
            data,
            pts: Timestamp::none(time_base),
            dts: Timestamp::none(time_base),
            duration: Duration::zero(time_base),
            stream_index: 0,
            flags: PacketFlags::empty(),
        }
    }

    /// Get the packet data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the packet data.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Get the size of the packet data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this packet is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this is a keyframe packet.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(PacketFlags::KEYFRAME)
    }

    /// Set the keyframe flag.
    pub fn set_keyframe(&mut self, keyframe: bool) {
        self.flags.set(PacketFlags::KEYFRAME, keyframe);
    }

    /// Time base the packet's timestamps are labelled with.
    pub fn time_base(&self) -> TimeBase {
        self.pts.time_base
    }

    /// Convert timestamps counted in `source` to `target`.
    ///
    /// Pts and dts round to nearest and leave the unset sentinel alone; a
    /// positive duration rounds to nearest. All three end up labelled `target`.
    pub fn rescale_ts(&mut self, source: TimeBase, target: TimeBase) {
        self.pts = self.pts.rescale_with(source, target);
        self.dts = self.dts.rescale_with(source, target);
        self.duration = self.duration.rescale_with(source, target);
    }

    /// Create a new packet with the specified timestamps.
    pub fn with_timestamps(mut self, pts: Timestamp, dts: Timestamp) -> Self {
        self.pts = pts;
        self.dts = dts;
        self
    }

    /// Create a new packet with the specified duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Create a new packet with the specified stream index.
    pub fn with_stream_index(mut self, index: u32) -> Self {
        self.stream_index = index;
        self
    }

    /// Create a new packet with the specified flags.
    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("size", &self.size())
            .field("pts", &self.pts.get())
            .field("dts", &self.dts.get())
            .field("duration", &self.duration.value)
            .field("time_base", &self.time_base())
            .field("stream_index", &self.stream_index)
            .field("flags", &self.flags)
            .finish()
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_creation() {
        let packet = Packet::new(vec![0u8; 100]);
        assert_eq!(packet.size(), 100);
        assert!(!packet.pts.is_valid());
        assert!(!packet.dts.is_valid());
    }

    #[test]
    fn test_packet_keyframe() {
        let mut packet = Packet::default();
        assert!(!packet.is_keyframe());
        packet.set_keyframe(true);
        assert!(packet.is_keyframe());
        packet.set_keyframe(false);
        assert!(!packet.is_keyframe());
    }

    #[test]
    fn test_rescale_ts() {
        let enc = TimeBase::new(1, 25);
        let out = TimeBase::new(1, 1000);
        let mut packet = Packet::new(vec![1])
            .with_timestamps(Timestamp::new(3, enc), Timestamp::none(enc))
            .with_duration(Duration::new(1, enc));

        packet.rescale_ts(enc, out);

        assert_eq!(packet.pts, Timestamp::new(120, out));
        assert!(!packet.dts.is_valid());
        assert_eq!(packet.duration, Duration::new(40, out));
        assert_eq!(packet.time_base(), out);
    }
}
