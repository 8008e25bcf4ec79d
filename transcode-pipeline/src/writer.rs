//! Output writer: owns the muxer and converts packet timing on the way in.

use crate::capability::{Muxer, StreamParameters};
use crate::error::{PipelineError, Result, Stage, StageOp};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};
use transcode_core::error::ContainerError;
use transcode_core::{Packet, TimeBase};

#[derive(Debug, Clone)]
struct OutputStream {
    time_base: TimeBase,
    packets_written: u64,
    last_dts: Option<i64>,
}

/// Wraps a [`Muxer`] with header/trailer bookkeeping and timestamp rescaling.
pub struct OutputWriter {
    muxer: Box<dyn Muxer>,
    streams: BTreeMap<usize, OutputStream>,
    header_written: bool,
    trailer_written: bool,
}

impl OutputWriter {
    /// Take ownership of an opened muxer.
    pub fn new(muxer: Box<dyn Muxer>) -> Self {
        Self {
            muxer,
            streams: BTreeMap::new(),
            header_written: false,
            trailer_written: false,
        }
    }

    fn mux_error(op: StageOp, source: impl Into<transcode_core::Error>) -> PipelineError {
        PipelineError::stage_failure(Stage::Mux, op, source.into())
    }

    /// Format name of the underlying muxer.
    pub fn format_name(&self) -> &str {
        self.muxer.format_name()
    }

    /// Whether the container wants codec configuration in its header.
    pub fn requires_global_header(&self) -> bool {
        self.muxer.requires_global_header()
    }

    /// Add an output stream. Must be called before the header is written.
    pub fn add_stream(&mut self, parameters: &StreamParameters, time_base: TimeBase) -> Result<usize> {
        if self.header_written {
            return Err(Self::mux_error(
                StageOp::AddStream,
                ContainerError::Other("stream added after header".into()),
            ));
        }
        let index = self
            .muxer
            .add_stream(parameters, time_base)
            .map_err(|e| Self::mux_error(StageOp::AddStream, e))?;

        self.streams.insert(
            index,
            OutputStream {
                time_base,
                packets_written: 0,
                last_dts: None,
            },
        );

        debug!(stream = index, codec = %parameters.codec_id, time_base = %time_base, "Output stream added");
        Ok(index)
    }

    /// Write the container header, then pick up any time base the muxer changed.
    pub fn write_header(&mut self, options: &BTreeMap<String, String>) -> Result<()> {
        if self.header_written {
            return Err(Self::mux_error(
                StageOp::WriteHeader,
                ContainerError::Other("header already written".into()),
            ));
        }
        self.muxer
            .write_header(options)
            .map_err(|e| Self::mux_error(StageOp::WriteHeader, e))?;
        self.header_written = true;

        for (&index, stream) in self.streams.iter_mut() {
            if let Some(tb) = self.muxer.stream_time_base(index) {
                if tb != stream.time_base {
                    debug!(stream = index, requested = %stream.time_base, actual = %tb, "Muxer adjusted time base");
                    stream.time_base = tb;
                }
            }
        }
        Ok(())
    }

    /// Time base of an output stream.
    pub fn stream_time_base(&self, index: usize) -> Option<TimeBase> {
        self.streams.get(&index).map(|s| s.time_base)
    }

    /// Rescale `packet` from `source` to the stream's time base, assign it to
    /// `index` and write it.
    pub fn write(&mut self, mut packet: Packet, source: TimeBase, index: usize) -> Result<()> {
        if !self.header_written {
            return Err(Self::mux_error(StageOp::WritePacket, ContainerError::HeaderNotWritten));
        }
        let stream = self.streams.get_mut(&index).ok_or_else(|| {
            Self::mux_error(StageOp::WritePacket, ContainerError::StreamNotFound { index: index as u32 })
        })?;

        packet.rescale_ts(source, stream.time_base);
        packet.stream_index = index as u32;

        if let Some(dts) = packet.dts.get() {
            if let Some(last) = stream.last_dts {
                if dts <= last {
                    warn!(stream = index, dts, last, "Non-monotonic dts");
                }
            }
            stream.last_dts = Some(dts);
        }
        stream.packets_written += 1;

        trace!(
            stream = index,
            pts = ?packet.pts.get(),
            dts = ?packet.dts.get(),
            size = packet.size(),
            "Muxing packet"
        );

        self.muxer
            .write_interleaved_packet(packet)
            .map_err(|e| Self::mux_error(StageOp::WritePacket, e))
    }

    /// Write the container trailer. A second call does nothing.
    pub fn write_trailer(&mut self) -> Result<()> {
        if self.trailer_written {
            return Ok(());
        }
        if !self.header_written {
            return Err(Self::mux_error(StageOp::WriteTrailer, ContainerError::HeaderNotWritten));
        }
        self.trailer_written = true;
        self.muxer
            .write_trailer()
            .map_err(|e| Self::mux_error(StageOp::WriteTrailer, e))
    }

    /// Whether the header has been written.
    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Whether the trailer has been written.
    pub fn trailer_written(&self) -> bool {
        self.trailer_written
    }

    /// Packets written to one stream.
    pub fn packets_written(&self, index: usize) -> u64 {
        self.streams.get(&index).map_or(0, |s| s.packets_written)
    }

    /// Packets written across all streams.
    pub fn total_packets_written(&self) -> u64 {
        self.streams.values().map(|s| s.packets_written).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use transcode_core::{CodecId, Duration, PixelFormat, Timestamp};

    #[derive(Default)]
    struct Log {
        packets: Vec<Packet>,
        trailers: usize,
    }

    struct RecordingMuxer {
        log: Arc<Mutex<Log>>,
        header_time_base: Option<TimeBase>,
        streams: usize,
        first_index: usize,
    }

    impl Muxer for RecordingMuxer {
        fn format_name(&self) -> &str {
            "recording"
        }

        fn requires_global_header(&self) -> bool {
            false
        }

        fn add_stream(&mut self, _parameters: &StreamParameters, _time_base: TimeBase) -> transcode_core::Result<usize> {
            self.streams += 1;
            Ok(self.first_index + self.streams - 1)
        }

        fn write_header(&mut self, _options: &BTreeMap<String, String>) -> transcode_core::Result<()> {
            Ok(())
        }

        fn stream_time_base(&self, _index: usize) -> Option<TimeBase> {
            self.header_time_base
        }

        fn write_interleaved_packet(&mut self, packet: Packet) -> transcode_core::Result<()> {
            self.log.lock().unwrap().packets.push(packet);
            Ok(())
        }

        fn write_trailer(&mut self) -> transcode_core::Result<()> {
            self.log.lock().unwrap().trailers += 1;
            Ok(())
        }
    }

    fn writer(header_time_base: Option<TimeBase>) -> (OutputWriter, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let muxer = RecordingMuxer {
            log: Arc::clone(&log),
            header_time_base,
            streams: 0,
            first_index: 0,
        };
        (OutputWriter::new(Box::new(muxer)), log)
    }

    fn params() -> StreamParameters {
        StreamParameters::video(CodecId::Vp9, 16, 16, PixelFormat::Yuv420p)
    }

    #[test]
    fn test_write_before_header_fails() {
        let (mut writer, _) = writer(None);
        writer.add_stream(&params(), TimeBase::new(1, 25)).unwrap();

        let err = writer.write(Packet::new(vec![1]), TimeBase::new(1, 25), 0).unwrap_err();
        assert!(matches!(err, PipelineError::MuxWrite { op: StageOp::WritePacket, .. }));
    }

    #[test]
    fn test_write_rescales_to_adjusted_time_base() {
        let (mut writer, log) = writer(Some(TimeBase::new(1, 1000)));
        let enc = TimeBase::new(1, 25);
        writer.add_stream(&params(), enc).unwrap();
        writer.write_header(&BTreeMap::new()).unwrap();
        assert_eq!(writer.stream_time_base(0), Some(TimeBase::new(1, 1000)));

        let packet = Packet::new(vec![0; 4])
            .with_timestamps(Timestamp::new(2, enc), Timestamp::new(2, enc))
            .with_duration(Duration::new(1, enc))
            .with_stream_index(7);
        writer.write(packet, enc, 0).unwrap();

        let log = log.lock().unwrap();
        let written = &log.packets[0];
        assert_eq!(written.pts.value, 80);
        assert_eq!(written.dts.value, 80);
        assert_eq!(written.duration.value, 40);
        assert_eq!(written.stream_index, 0);
        assert_eq!(writer.packets_written(0), 1);
    }

    #[test]
    fn test_unset_pts_is_not_rescaled() {
        let (mut writer, log) = writer(Some(TimeBase::MPEG));
        let enc = TimeBase::new(1, 30);
        writer.add_stream(&params(), enc).unwrap();
        writer.write_header(&BTreeMap::new()).unwrap();

        let packet = Packet::new(vec![0]).with_timestamps(Timestamp::none(enc), Timestamp::none(enc));
        writer.write(packet, enc, 0).unwrap();

        assert_eq!(log.lock().unwrap().packets[0].pts.value, Timestamp::NONE);
    }

    #[test]
    fn test_trailer_requires_header_and_is_written_once() {
        let (mut writer, log) = writer(None);
        assert!(writer.write_trailer().is_err());

        writer.write_header(&BTreeMap::new()).unwrap();
        writer.write_trailer().unwrap();
        writer.write_trailer().unwrap();
        assert!(writer.trailer_written());
        assert_eq!(log.lock().unwrap().trailers, 1);
    }

    #[test]
    fn test_unknown_stream_fails() {
        let (mut writer, _) = writer(None);
        writer.write_header(&BTreeMap::new()).unwrap();
        assert!(writer.write(Packet::new(vec![0]), TimeBase::MPEG, 3).is_err());
    }

    #[test]
    fn test_only_returned_stream_indices_accept_packets() {
        let log = Arc::new(Mutex::new(Log::default()));
        let muxer = RecordingMuxer {
            log: Arc::clone(&log),
            header_time_base: None,
            streams: 0,
            first_index: 2,
        };
        let mut writer = OutputWriter::new(Box::new(muxer));
        let enc = TimeBase::new(1, 25);
        let index = writer.add_stream(&params(), enc).unwrap();
        assert_eq!(index, 2);
        writer.write_header(&BTreeMap::new()).unwrap();

        assert_eq!(writer.stream_time_base(0), None);
        let err = writer.write(Packet::new(vec![0]), enc, 0).unwrap_err();
        assert!(matches!(err, PipelineError::MuxWrite { op: StageOp::WritePacket, .. }));

        writer.write(Packet::new(vec![1]), enc, index).unwrap();
        assert_eq!(log.lock().unwrap().packets[0].stream_index, 2);
        assert_eq!(writer.packets_written(2), 1);
        assert_eq!(writer.total_packets_written(), 1);
    }
}
