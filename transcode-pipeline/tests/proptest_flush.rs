//! Property-based tests for buffering stages.
//!
//! Whatever the decoder lag and encoder delay, every packet read must come
//! out of the pipeline exactly once and in order.

use proptest::prelude::*;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use transcode_core::{CodecId, Frame, Packet, PixelFormat, Rational, TimeBase, Timestamp};
use transcode_pipeline::*;

// =============================================================================
// Mock Implementations
// =============================================================================

struct VecDemuxer {
    stream: StreamInfo,
    packets: VecDeque<Packet>,
}

impl VecDemuxer {
    fn new(num_packets: i64) -> Self {
        let tb = TimeBase::new(1, 25);
        let packets = (0..num_packets)
            .map(|i| {
                let mut packet = Packet::new(vec![i as u8; 8])
                    .with_timestamps(Timestamp::new(i, tb), Timestamp::new(i, tb));
                packet.set_keyframe(i % 5 == 0);
                packet
            })
            .collect();
        Self {
            stream: StreamInfo {
                index: 0,
                time_base: tb,
                parameters: StreamParameters::video(CodecId::H264, 4, 2, PixelFormat::Gray8)
                    .with_frame_rate(Rational::new(25, 1)),
            },
            packets,
        }
    }
}

impl Demuxer for VecDemuxer {
    fn format_name(&self) -> &str {
        "vec"
    }

    fn num_streams(&self) -> usize {
        1
    }

    fn stream(&self, index: usize) -> Option<&StreamInfo> {
        (index == 0).then_some(&self.stream)
    }

    fn read_packet(&mut self) -> transcode_core::Result<Option<Packet>> {
        Ok(self.packets.pop_front())
    }
}

struct CollectingMuxer {
    pts: Arc<Mutex<Vec<i64>>>,
    streams: Vec<TimeBase>,
}

impl Muxer for CollectingMuxer {
    fn format_name(&self) -> &str {
        "collect"
    }

    fn requires_global_header(&self) -> bool {
        false
    }

    fn add_stream(&mut self, _parameters: &StreamParameters, time_base: TimeBase) -> transcode_core::Result<usize> {
        self.streams.push(time_base);
        Ok(self.streams.len() - 1)
    }

    fn write_header(&mut self, _options: &BTreeMap<String, String>) -> transcode_core::Result<()> {
        Ok(())
    }

    fn stream_time_base(&self, index: usize) -> Option<TimeBase> {
        self.streams.get(index).copied()
    }

    fn write_interleaved_packet(&mut self, packet: Packet) -> transcode_core::Result<()> {
        self.pts.lock().unwrap().push(packet.pts.value);
        Ok(())
    }

    fn write_trailer(&mut self) -> transcode_core::Result<()> {
        Ok(())
    }
}

/// Holds back `lag` frames until flushed.
struct LaggingDecoderFactory {
    lag: usize,
}

struct LaggingDecoder {
    inner: Box<dyn Decoder>,
    held: VecDeque<Frame>,
    lag: usize,
    flushed: bool,
}

impl DecoderFactory for LaggingDecoderFactory {
    fn name(&self) -> &str {
        "lagging"
    }

    fn open(&self, stream: &StreamInfo) -> transcode_core::Result<Box<dyn Decoder>> {
        Ok(Box::new(LaggingDecoder {
            inner: DecoderFactory::open(&CopyCodec::new(CodecId::H264), stream)?,
            held: VecDeque::new(),
            lag: self.lag,
            flushed: false,
        }))
    }
}

impl Decoder for LaggingDecoder {
    fn send(&mut self, packet: Option<Packet>) -> transcode_core::Result<()> {
        self.flushed |= packet.is_none();
        self.inner.as_mut().send(packet)?;
        while let Receive::Ready(frame) = self.inner.as_mut().receive()? {
            self.held.push_back(frame);
        }
        Ok(())
    }

    fn receive(&mut self) -> transcode_core::Result<Receive<Frame>> {
        if self.held.len() > self.lag || self.flushed {
            if let Some(frame) = self.held.pop_front() {
                return Ok(Receive::Ready(frame));
            }
        }
        Ok(if self.flushed {
            Receive::Drained
        } else {
            Receive::NeedsMoreInput
        })
    }
}

fn run(num_packets: i64, lag: usize, delay: usize) -> (Result<TranscodeStats>, Vec<i64>) {
    let mut registry = Registry::new();
    registry.register_decoder(CodecId::H264, LaggingDecoderFactory { lag });
    registry.register_encoder(CodecId::Vp9, CopyCodec::new(CodecId::Vp9).with_delay(delay));

    let pts = Arc::new(Mutex::new(Vec::new()));
    let muxer = CollectingMuxer {
        pts: Arc::clone(&pts),
        streams: Vec::new(),
    };

    let mut pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(registry));
    let result = pipeline.run(Box::new(VecDemuxer::new(num_packets)), Box::new(muxer));
    let written = pts.lock().unwrap().clone();
    (result, written)
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn every_frame_is_written_once(num_packets in 0i64..40, lag in 0usize..6, delay in 0usize..6) {
        let (result, written) = run(num_packets, lag, delay);
        let stats = result.unwrap();

        prop_assert_eq!(stats.frames_decoded, num_packets as u64);
        prop_assert_eq!(stats.frames_filtered, stats.frames_decoded);
        prop_assert_eq!(stats.packets_written, stats.frames_filtered);
        prop_assert_eq!(written, (0..num_packets).collect::<Vec<_>>());
    }

    #[test]
    fn encoder_flush_releases_its_delay(num_packets in 0i64..40, lag in 0usize..6, delay in 0usize..6) {
        let (result, _) = run(num_packets, lag, delay);
        let stats = result.unwrap();

        prop_assert_eq!(stats.flush_packets_written, delay.min(num_packets as usize) as u64);
    }
}
