//! Filter stage and the built-in pass-through graph.

use crate::capability::{FilterGraph, FilterGraphBuilder, FilterInput, FilterOutputHint, Receive};
use crate::error::{PipelineError, Result, Stage, StageOp};
use std::collections::VecDeque;
use tracing::debug;
use transcode_core::error::{CodecError, Error as CoreError};
use transcode_core::{Frame, MediaKind, PictureKind, TimeBase};

/// A configured filter graph and the bookkeeping around it.
pub struct FilterStage {
    graph: Box<dyn FilterGraph>,
    spec: String,
    output_time_base: TimeBase,
    flushed: bool,
}

impl FilterStage {
    /// Build a graph from `spec` with the given builder.
    pub fn configure(
        builder: &dyn FilterGraphBuilder,
        spec: &str,
        input: &FilterInput,
        hint: &FilterOutputHint,
    ) -> Result<Self> {
        let graph = builder
            .configure(spec, input, hint)
            .map_err(|source| PipelineError::FilterConfig {
                spec: spec.to_string(),
                source,
            })?;
        let output_time_base = graph.output_time_base();

        debug!(
            spec,
            input_time_base = %input.time_base,
            output_time_base = %output_time_base,
            pixel_format = %hint.pixel_format,
            "Filter graph configured"
        );

        Ok(Self {
            graph,
            spec: spec.to_string(),
            output_time_base,
            flushed: false,
        })
    }

    /// Graph description.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Time base of the frames the graph emits.
    pub fn output_time_base(&self) -> TimeBase {
        self.output_time_base
    }

    /// Feed one frame, or `None` at end of stream, and iterate the frames the
    /// graph releases.
    ///
    /// Nothing is pushed until the iterator is first advanced, so it must be
    /// consumed. Each frame is labelled with the graph's output time base and
    /// has its picture kind cleared so the encoder picks its own.
    pub fn push_frame(&mut self, frame: Option<Frame>) -> FilteredFrames<'_> {
        let rejected = self.flushed;
        let flushing = frame.is_none();
        self.flushed |= flushing;

        FilteredFrames {
            graph: self.graph.as_mut(),
            time_base: self.output_time_base,
            pending: if rejected { None } else { Some(frame) },
            rejected,
            flushing,
            done: false,
        }
    }
}

/// Frames released by one [`FilterStage::push_frame`] call.
pub struct FilteredFrames<'a> {
    graph: &'a mut dyn FilterGraph,
    time_base: TimeBase,
    pending: Option<Option<Frame>>,
    rejected: bool,
    flushing: bool,
    done: bool,
}

impl FilteredFrames<'_> {
    fn fail(&mut self, op: StageOp, source: CoreError) -> Option<Result<Frame>> {
        self.done = true;
        Some(Err(PipelineError::stage_failure(Stage::Filter, op, source)))
    }
}

impl Iterator for FilteredFrames<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.rejected {
            return self.fail(StageOp::Push, CodecError::AlreadyFlushed.into());
        }
        if let Some(input) = self.pending.take() {
            if let Err(e) = self.graph.push(input) {
                return self.fail(StageOp::Push, e);
            }
        }

        match self.graph.pull() {
            Ok(Receive::Ready(mut frame)) => {
                frame.set_time_base(self.time_base);
                frame.picture_kind = PictureKind::None;
                Some(Ok(frame))
            }
            Ok(Receive::NeedsMoreInput) if self.flushing => self.fail(
                StageOp::Pull,
                CodecError::Other("filter graph stalled after end of stream".into()).into(),
            ),
            Ok(Receive::NeedsMoreInput) => {
                self.done = true;
                None
            }
            Ok(Receive::Drained) if !self.flushing => self.fail(
                StageOp::Pull,
                CodecError::Other("filter graph exhausted before end of stream".into()).into(),
            ),
            Ok(Receive::Drained) => {
                self.done = true;
                None
            }
            Err(e) => self.fail(StageOp::Pull, e),
        }
    }
}

/// Builder for the `null` graph, which passes video frames through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGraphBuilder;

impl FilterGraphBuilder for NullGraphBuilder {
    fn configure(
        &self,
        spec: &str,
        input: &FilterInput,
        hint: &FilterOutputHint,
    ) -> transcode_core::Result<Box<dyn FilterGraph>> {
        if spec.trim() != "null" {
            return Err(CoreError::unsupported(format!("unknown filter graph '{}'", spec)));
        }
        if input.kind != MediaKind::Video {
            return Err(CoreError::unsupported(format!(
                "cannot build a video graph for a {} stream",
                input.kind
            )));
        }
        if input.pixel_format != hint.pixel_format {
            return Err(CoreError::Config(format!(
                "null graph cannot convert {} to {}",
                input.pixel_format, hint.pixel_format
            )));
        }

        Ok(Box::new(NullFilterGraph::new(input.time_base)))
    }
}

/// Pass-through graph.
#[derive(Debug)]
pub struct NullFilterGraph {
    time_base: TimeBase,
    queue: VecDeque<Frame>,
    eof: bool,
}

impl NullFilterGraph {
    /// Create a graph whose output time base equals its input time base.
    pub fn new(time_base: TimeBase) -> Self {
        Self {
            time_base,
            queue: VecDeque::new(),
            eof: false,
        }
    }
}

impl FilterGraph for NullFilterGraph {
    fn output_time_base(&self) -> TimeBase {
        self.time_base
    }

    fn push(&mut self, frame: Option<Frame>) -> transcode_core::Result<()> {
        if self.eof {
            return Err(CodecError::AlreadyFlushed.into());
        }
        match frame {
            Some(frame) => self.queue.push_back(frame),
            None => self.eof = true,
        }
        Ok(())
    }

    fn pull(&mut self) -> transcode_core::Result<Receive<Frame>> {
        Ok(match self.queue.pop_front() {
            Some(frame) => Receive::Ready(frame),
            None if self.eof => Receive::Drained,
            None => Receive::NeedsMoreInput,
        })
    }
}
