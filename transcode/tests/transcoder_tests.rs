//! File-level transcoder integration tests.
//!
//! Uses a synthetic input format (a text file naming how many streams and
//! packets to generate) and a raw output format that concatenates packet
//! payloads, with the copy codec standing in for real codecs.

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use transcode::{
    CodecId, ContainerFormat, Demuxer, Error, InputFormat, MediaKind, Muxer, OutputFormat, Packet,
    PipelineError, PipelineState, PixelFormat, Rational, Registry, StreamInfo, StreamParameters,
    TimeBase, Timestamp, TranscodeOptions, Transcoder,
};

// =============================================================================
// Synthetic Formats
// =============================================================================

struct SyntheticInput;

struct SyntheticDemuxer {
    streams: Vec<StreamInfo>,
    packets: VecDeque<Packet>,
}

impl InputFormat for SyntheticInput {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn probe(&self, source: &Path) -> bool {
        source.extension().and_then(|e| e.to_str()) == Some("syn")
    }

    fn open(&self, source: &Path) -> transcode_core::Result<Box<dyn Demuxer>> {
        let text = std::fs::read_to_string(source)?;
        let mut fields = text.split_whitespace().map(str::parse::<i64>);
        let (Some(Ok(streams)), Some(Ok(packets))) = (fields.next(), fields.next()) else {
            return Err(transcode_core::Error::invalid_param("expected '<streams> <packets>'"));
        };

        let tb = TimeBase::new(1, 25);
        let mut infos = vec![StreamInfo {
            index: 0,
            time_base: tb,
            parameters: StreamParameters::video(CodecId::H264, 4, 2, PixelFormat::Gray8)
                .with_frame_rate(Rational::new(25, 1)),
        }];
        for index in 1..streams as usize {
            infos.push(StreamInfo {
                index,
                time_base: TimeBase::new(1, 48000),
                parameters: StreamParameters::other(CodecId::Aac, MediaKind::Audio),
            });
        }

        let packets = (0..packets)
            .map(|i| {
                let mut packet = Packet::new(vec![i as u8; 8])
                    .with_timestamps(Timestamp::new(i, tb), Timestamp::new(i, tb));
                packet.set_keyframe(i % 5 == 0);
                packet
            })
            .collect();

        Ok(Box::new(SyntheticDemuxer {
            streams: infos,
            packets,
        }))
    }
}

impl Demuxer for SyntheticDemuxer {
    fn format_name(&self) -> &str {
        "synthetic"
    }

    fn num_streams(&self) -> usize {
        self.streams.len()
    }

    fn stream(&self, index: usize) -> Option<&StreamInfo> {
        self.streams.get(index)
    }

    fn read_packet(&mut self) -> transcode_core::Result<Option<Packet>> {
        Ok(self.packets.pop_front())
    }
}

struct RawOutput;

struct RawMuxer {
    file: File,
    streams: Vec<TimeBase>,
}

impl OutputFormat for RawOutput {
    fn name(&self) -> &str {
        "raw"
    }

    fn accepts(&self, container: ContainerFormat) -> bool {
        container == ContainerFormat::Raw
    }

    fn open(&self, destination: &Path, _container: Option<ContainerFormat>) -> transcode_core::Result<Box<dyn Muxer>> {
        Ok(Box::new(RawMuxer {
            file: File::create(destination)?,
            streams: Vec::new(),
        }))
    }
}

impl Muxer for RawMuxer {
    fn format_name(&self) -> &str {
        "raw"
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
        self.file.write_all(packet.data())?;
        Ok(())
    }

    fn write_trailer(&mut self) -> transcode_core::Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn registry(encoder_delay: usize) -> Arc<Registry> {
    let mut registry = Registry::new();
    registry.register_copy(CodecId::H264, 0);
    registry.register_copy(CodecId::Vp9, encoder_delay);
    registry.register_input_format(SyntheticInput);
    registry.register_output_format(RawOutput);
    Arc::new(registry)
}

fn write_input(dir: &Path, streams: usize, packets: usize) -> std::path::PathBuf {
    let path = dir.join("clip.syn");
    std::fs::write(&path, format!("{} {}", streams, packets)).unwrap();
    path
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_transcode_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), 1, 10);
    let output = dir.path().join("nested").join("clip.ivf");

    let options = TranscodeOptions::new().input(&input).output(&output);
    let mut transcoder = Transcoder::new(options, registry(0)).unwrap();
    let stats = transcoder.run().unwrap();

    assert_eq!(stats.packets_read, 10);
    assert_eq!(stats.packets_written, 10);
    assert_eq!(stats.flush_packets_written, 0);
    assert_eq!(transcoder.state(), PipelineState::Finalized);

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(bytes.len(), 80);
    assert_eq!(&bytes[72..], &[9u8; 8]);
}

#[test]
fn test_encoder_delay_is_flushed() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), 1, 10);
    let output = dir.path().join("clip.ivf");

    let options = TranscodeOptions::new().input(&input).output(&output);
    let stats = Transcoder::new(options, registry(2)).unwrap().run().unwrap();

    assert_eq!(stats.packets_written, 10);
    assert_eq!(stats.flush_packets_written, 2);
    assert_eq!(std::fs::metadata(&output).unwrap().len(), 80);
}

#[test]
fn test_two_stream_input_creates_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), 2, 10);
    let output = dir.path().join("clip.ivf");

    let options = TranscodeOptions::new().input(&input).output(&output);
    let mut transcoder = Transcoder::new(options, registry(0)).unwrap();
    let err = transcoder.run().unwrap_err();

    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::UnsupportedInputShape(_))
    ));
    assert_eq!(transcoder.state(), PipelineState::Finalized);
    assert!(!output.exists());
}

#[test]
fn test_existing_output_is_kept_without_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), 1, 3);
    let output = dir.path().join("clip.ivf");
    std::fs::write(&output, b"keep").unwrap();

    let options = TranscodeOptions::new().input(&input).output(&output);
    let err = Transcoder::new(options.clone(), registry(0)).unwrap().run().unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::AlreadyExists));
    assert_eq!(std::fs::read(&output).unwrap(), b"keep");

    let stats = Transcoder::new(options.overwrite(true), registry(0)).unwrap().run().unwrap();
    assert_eq!(stats.packets_written, 3);
    assert_eq!(std::fs::metadata(&output).unwrap().len(), 24);
}

#[test]
fn test_progress_callback() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), 1, 7);
    let output = dir.path().join("clip.ivf");

    let calls = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&calls);
    let options = TranscodeOptions::new().input(&input).output(&output);
    let mut transcoder = Transcoder::new(options, registry(0))
        .unwrap()
        .on_progress(move |stats| {
            seen.store(stats.packets_read, Ordering::SeqCst);
        });
    transcoder.run().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 7);
}

#[test]
fn test_unsupported_output_container() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), 1, 3);
    let output = dir.path().join("clip.mp4");

    let options = TranscodeOptions::new().input(&input).output(&output);
    let mut transcoder = Transcoder::new(options, registry(0)).unwrap();
    let err = transcoder.run().unwrap_err();

    let pipeline_err = err.as_pipeline().unwrap();
    assert!(matches!(pipeline_err, PipelineError::Open { .. }));
    assert_eq!(pipeline_err.stage(), Some(transcode_pipeline::Stage::Mux));
    assert!(!output.exists());
}

#[test]
fn test_missing_encoder() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), 1, 3);
    let output = dir.path().join("clip.ivf");

    let options = TranscodeOptions::new()
        .input(&input)
        .output(&output)
        .encoder(CodecId::Av1);
    let err = Transcoder::new(options, registry(0)).unwrap().run().unwrap_err();

    assert!(matches!(
        err,
        Error::Pipeline(PipelineError::UnsupportedCodec { .. })
    ));
}
