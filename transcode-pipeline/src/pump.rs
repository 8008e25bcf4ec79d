//! Send/receive driver shared by the decode and encode stages.

use crate::capability::{Decoder, Encoder, Receive};
use crate::error::{PipelineError, Result, Stage, StageOp};
use transcode_core::error::CodecError;
use transcode_core::{Frame, Packet};

/// A stage that consumes one kind of unit and produces another.
pub trait PumpStage {
    /// Unit sent to the stage.
    type Input;
    /// Unit received from the stage.
    type Output;

    /// Stage reported in errors.
    const STAGE: Stage;

    /// Send one unit, or `None` to start flushing.
    fn send(&mut self, input: Option<Self::Input>) -> transcode_core::Result<()>;

    /// Pull the next unit.
    fn receive(&mut self) -> transcode_core::Result<Receive<Self::Output>>;
}

impl PumpStage for Box<dyn Decoder> {
    type Input = Packet;
    type Output = Frame;
    const STAGE: Stage = Stage::Decode;

    fn send(&mut self, input: Option<Packet>) -> transcode_core::Result<()> {
        Decoder::send(&mut **self, input)
    }

    fn receive(&mut self) -> transcode_core::Result<Receive<Frame>> {
        Decoder::receive(&mut **self)
    }
}

impl PumpStage for Box<dyn Encoder> {
    type Input = Frame;
    type Output = Packet;
    const STAGE: Stage = Stage::Encode;

    fn send(&mut self, input: Option<Frame>) -> transcode_core::Result<()> {
        Encoder::send(&mut **self, input)
    }

    fn receive(&mut self) -> transcode_core::Result<Receive<Packet>> {
        Encoder::receive(&mut **self)
    }
}

/// Why a pump returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// The stage wants more input.
    NeedsMoreInput,
    /// The stage has been flushed and produced its last unit.
    Drained,
}

/// Drives a stage: send one unit, then receive until the stage stops
/// producing.
pub struct StagePump<S> {
    stage: S,
    sent_end: bool,
    drained: bool,
}

impl<S: PumpStage> StagePump<S> {
    /// Wrap a stage.
    pub fn new(stage: S) -> Self {
        Self {
            stage,
            sent_end: false,
            drained: false,
        }
    }

    /// Send `input` and hand every unit the stage produces to `handler`.
    ///
    /// `None` starts flushing; the stage must then report
    /// [`Receive::Drained`] once its buffers are empty. Asking for more input
    /// after the end of stream is a stage error, as is draining before it.
    /// Handler errors abort the pump and are returned unchanged.
    pub fn pump<F>(&mut self, input: Option<S::Input>, mut handler: F) -> Result<PumpOutcome>
    where
        F: FnMut(S::Output) -> Result<()>,
    {
        if self.drained || self.sent_end {
            return Err(PipelineError::stage_failure(
                S::STAGE,
                StageOp::Send,
                CodecError::AlreadyFlushed.into(),
            ));
        }

        let flushing = input.is_none();
        self.stage
            .send(input)
            .map_err(|e| PipelineError::stage_failure(S::STAGE, StageOp::Send, e))?;
        self.sent_end = flushing;

        loop {
            let received = self
                .stage
                .receive()
                .map_err(|e| PipelineError::stage_failure(S::STAGE, StageOp::Receive, e))?;

            match received {
                Receive::Ready(unit) => handler(unit)?,
                Receive::NeedsMoreInput if flushing => {
                    return Err(PipelineError::stage_failure(
                        S::STAGE,
                        StageOp::Receive,
                        CodecError::Other("stage stalled after end of stream".into()).into(),
                    ));
                }
                Receive::NeedsMoreInput => return Ok(PumpOutcome::NeedsMoreInput),
                Receive::Drained if !flushing => {
                    return Err(PipelineError::stage_failure(
                        S::STAGE,
                        StageOp::Receive,
                        CodecError::Other("stage drained before end of stream".into()).into(),
                    ));
                }
                Receive::Drained => {
                    self.drained = true;
                    return Ok(PumpOutcome::Drained);
                }
            }
        }
    }

    /// Flush the stage, handing every remaining unit to `handler`.
    pub fn drain<F>(&mut self, handler: F) -> Result<PumpOutcome>
    where
        F: FnMut(S::Output) -> Result<()>,
    {
        self.pump(None, handler)
    }

    /// Whether the stage has reported it is drained.
    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// Get the wrapped stage.
    pub fn get_ref(&self) -> &S {
        &self.stage
    }

    /// Unwrap the stage.
    pub fn into_inner(self) -> S {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Emits two outputs per input, holding one back until flushed.
    struct Doubler {
        queue: VecDeque<u32>,
        held: Option<u32>,
        flushed: bool,
        early_drain: bool,
        stall_after_end: bool,
    }

    impl Doubler {
        fn new() -> Self {
            Self {
                queue: VecDeque::new(),
                held: None,
                flushed: false,
                early_drain: false,
                stall_after_end: false,
            }
        }
    }

    impl PumpStage for Doubler {
        type Input = u32;
        type Output = u32;
        const STAGE: Stage = Stage::Decode;

        fn send(&mut self, input: Option<u32>) -> transcode_core::Result<()> {
            match input {
                Some(v) => {
                    if let Some(prev) = self.held.replace(v) {
                        self.queue.push_back(prev);
                        self.queue.push_back(prev);
                    }
                }
                None => {
                    if let Some(prev) = self.held.take() {
                        self.queue.push_back(prev);
                        self.queue.push_back(prev);
                    }
                    self.flushed = true;
                }
            }
            Ok(())
        }

        fn receive(&mut self) -> transcode_core::Result<Receive<u32>> {
            if self.early_drain {
                return Ok(Receive::Drained);
            }
            Ok(match self.queue.pop_front() {
                Some(v) => Receive::Ready(v),
                None if self.flushed && self.stall_after_end => Receive::NeedsMoreInput,
                None if self.flushed => Receive::Drained,
                None => Receive::NeedsMoreInput,
            })
        }
    }

    #[test]
    fn test_pump_collects_until_needs_input() {
        let mut pump = StagePump::new(Doubler::new());
        let mut out = Vec::new();

        assert_eq!(pump.pump(Some(1), |v| { out.push(v); Ok(()) }).unwrap(), PumpOutcome::NeedsMoreInput);
        assert!(out.is_empty());

        assert_eq!(pump.pump(Some(2), |v| { out.push(v); Ok(()) }).unwrap(), PumpOutcome::NeedsMoreInput);
        assert_eq!(out, vec![1, 1]);

        assert_eq!(pump.drain(|v| { out.push(v); Ok(()) }).unwrap(), PumpOutcome::Drained);
        assert_eq!(out, vec![1, 1, 2, 2]);
        assert!(pump.is_drained());
    }

    #[test]
    fn test_send_after_drain_is_rejected() {
        let mut pump = StagePump::new(Doubler::new());
        pump.drain(|_| Ok(())).unwrap();

        let err = pump.pump(Some(3), |_| Ok(())).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { op: StageOp::Send, .. }));
    }

    #[test]
    fn test_early_drain_is_an_error() {
        let mut stage = Doubler::new();
        stage.early_drain = true;
        let mut pump = StagePump::new(stage);

        let err = pump.pump(Some(1), |_| Ok(())).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { op: StageOp::Receive, .. }));
    }

    #[test]
    fn test_stall_after_end_is_an_error() {
        let mut stage = Doubler::new();
        stage.stall_after_end = true;
        let mut pump = StagePump::new(stage);
        pump.pump(Some(1), |_| Ok(())).unwrap();

        let mut out = Vec::new();
        let err = pump.drain(|v| { out.push(v); Ok(()) }).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { op: StageOp::Receive, .. }));
        assert!(err.to_string().contains("stalled"));
        assert_eq!(out, vec![1, 1]);
        assert!(!pump.is_drained());
    }

    #[test]
    fn test_handler_error_stops_pump() {
        let mut pump = StagePump::new(Doubler::new());
        pump.pump(Some(1), |_| Ok(())).unwrap();

        let mut seen = 0;
        let err = pump
            .pump(Some(2), |_| {
                seen += 1;
                Err(PipelineError::InvalidConfig("stop".into()))
            })
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
        assert_eq!(seen, 1);
    }
}
