//! Dedicated encoder thread fed through a FIFO message queue
//!
//! The producer (render/capture loop) owns a [`WorkerHandle`] and never
//! blocks: frames are sent over an unbounded channel and the frame budget is
//! tracked on the producer side. The encoder thread owns the sink (output
//! file, encoder, muxer) for the whole session and is the only place that
//! touches it.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use super::recorder::{Mp4Recorder, Mp4Settings};
use super::sink::VideoSink;
use super::stats::{FinishReason, SessionReport, SinkSummary};
use crate::config::RecorderConfig;
use crate::errors::RecordError;
use crate::frame::Frame;

/// Messages understood by the encoder thread
#[derive(Debug)]
pub enum ControlMessage {
    EncodeFrame(Frame),
    Finish,
}

/// Result of [`WorkerHandle::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmitOutcome {
    /// Frame queued; `remaining` frames of budget are left
    Accepted { remaining: u32 },
    Rejected(RejectReason),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// The session's frame budget is used up
    BudgetExhausted,
    /// `finish` was already requested for this session
    FinishRequested,
    /// The encoder thread has already terminated
    WorkerGone,
    /// No session is active
    NotRecording,
}

/// Options for spawning an encoder thread
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Frames accepted before the session finalizes itself
    pub frame_budget: u32,
    pub thread_name: String,
    /// Reported back in [`SessionReport::output_path`]
    pub output_path: Option<PathBuf>,
}

impl WorkerOptions {
    pub fn new(frame_budget: u32) -> Self {
        Self {
            frame_budget,
            thread_name: "crabreel-encoder".to_string(),
            output_path: None,
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

pub struct EncodingWorker;

impl EncodingWorker {
    /// Start an MP4 recording session writing to `output_path`.
    ///
    /// Missing parent directories are created. Returns `RecordError::Io` if
    /// the output cannot be created; in that case no thread is left running.
    pub fn start<P: AsRef<Path>>(
        output_path: P,
        config: &RecorderConfig,
    ) -> Result<WorkerHandle, RecordError> {
        config.validate()?;

        let path = output_path.as_ref().to_path_buf();
        let settings = Mp4Settings::from(config);
        let options = WorkerOptions::new(config.frame_budget).with_output_path(&path);

        Self::spawn(move || Mp4Recorder::create(&path, settings), options)
    }

    /// Start a session on any sink.
    ///
    /// `open` runs on the encoder thread; its error is handed back before
    /// this returns.
    pub fn spawn<S, F>(open: F, options: WorkerOptions) -> Result<WorkerHandle, RecordError>
    where
        S: VideoSink + 'static,
        F: FnOnce() -> Result<S, RecordError> + Send + 'static,
    {
        if options.frame_budget == 0 {
            return Err(RecordError::Config("Frame budget must be at least 1".into()));
        }

        let (sender, receiver) = crossbeam_channel::unbounded::<ControlMessage>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), RecordError>>(1);
        let budget = options.frame_budget;
        let output_path = options.output_path.clone();

        let join = std::thread::Builder::new()
            .name(options.thread_name.clone())
            .spawn(move || {
                let sink = match open() {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(()));
                        sink
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return None;
                    }
                };
                Some(EncodingSession::new(sink, budget, output_path).run(receiver))
            })
            .map_err(|e| RecordError::Io(format!("Failed to spawn encoder thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = join.join();
                log::error!("Recording failed to start: {}", e);
                return Err(e);
            }
            Err(_) => {
                let _ = join.join();
                return Err(RecordError::Protocol(
                    "Encoder thread exited during startup".into(),
                ));
            }
        }

        log::info!(
            "Encoder thread started (budget {} frames, output {:?})",
            budget,
            options.output_path
        );

        Ok(WorkerHandle {
            sender,
            join: Some(join),
            remaining: budget,
            finish_requested: false,
            output_path: options.output_path,
        })
    }
}

/// Producer-side handle to one recording session.
///
/// Dropping the handle is fire-and-forget: the channel disconnects, the
/// encoder thread drains what is already queued, then finalizes.
pub struct WorkerHandle {
    sender: Sender<ControlMessage>,
    join: Option<JoinHandle<Option<SessionReport>>>,
    remaining: u32,
    finish_requested: bool,
    output_path: Option<PathBuf>,
}

impl WorkerHandle {
    /// Queue a frame for encoding without blocking.
    ///
    /// Frames beyond the budget, after `finish`, or after the thread has
    /// exited are dropped with a warning.
    pub fn submit(&mut self, frame: Frame) -> SubmitOutcome {
        let reason = if self.finish_requested {
            RejectReason::FinishRequested
        } else if self.remaining == 0 {
            RejectReason::BudgetExhausted
        } else {
            match self.sender.send(ControlMessage::EncodeFrame(frame)) {
                Ok(()) => {
                    self.remaining -= 1;
                    log::debug!("Frame queued, {} left in budget", self.remaining);
                    return SubmitOutcome::Accepted {
                        remaining: self.remaining,
                    };
                }
                Err(_) => RejectReason::WorkerGone,
            }
        };

        log::warn!("Dropping submitted frame: {:?}", reason);
        SubmitOutcome::Rejected(reason)
    }

    /// Ask the encoder thread to finalize after the frames already queued.
    ///
    /// Returns true only for the call that actually queued `Finish`. Repeat
    /// calls, and calls after the budget ran out (the thread finalizes on its
    /// own then), do nothing.
    pub fn finish(&mut self) -> bool {
        if self.finish_requested {
            log::debug!("Finish already requested");
            return false;
        }
        self.finish_requested = true;

        if self.remaining == 0 {
            log::debug!("Budget exhausted, encoder finalizes on its own");
            return false;
        }

        match self.sender.send(ControlMessage::Finish) {
            Ok(()) => {
                log::info!("Finish requested");
                true
            }
            Err(_) => {
                log::debug!("Encoder thread already gone, nothing to finish");
                false
            }
        }
    }

    /// Remaining frame budget
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn finish_requested(&self) -> bool {
        self.finish_requested
    }

    /// True while frames can still be accepted
    pub fn accepts_frames(&self) -> bool {
        !self.finish_requested && self.remaining > 0
    }

    /// True once the encoder thread has exited
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Finish gracefully: let every queued frame be encoded, then wait for
    /// the encoder thread and return its report.
    pub fn join(mut self) -> Result<SessionReport, RecordError> {
        self.finish();

        let join = self
            .join
            .take()
            .ok_or_else(|| RecordError::Protocol("Encoder thread already joined".into()))?;

        // Waking a worker still blocked in recv.
        drop(self.sender);

        match join.join() {
            Ok(Some(report)) => Ok(report),
            Ok(None) => Err(RecordError::Protocol(
                "Encoder thread never started a session".into(),
            )),
            Err(_) => Err(RecordError::Protocol("Encoder thread panicked".into())),
        }
    }

    /// Request finish and return without waiting
    pub fn detach(mut self) {
        self.finish();
    }
}

/// Encoder-thread side of a session
struct EncodingSession<S: VideoSink> {
    sink: S,
    budget: u64,
    output_path: Option<PathBuf>,
    received: u64,
    encoded: u64,
    failed: u64,
}

impl<S: VideoSink> EncodingSession<S> {
    fn new(sink: S, budget: u32, output_path: Option<PathBuf>) -> Self {
        Self {
            sink,
            budget: budget as u64,
            output_path,
            received: 0,
            encoded: 0,
            failed: 0,
        }
    }

    fn run(mut self, receiver: Receiver<ControlMessage>) -> SessionReport {
        let finish_reason = loop {
            match receiver.recv() {
                Ok(ControlMessage::EncodeFrame(frame)) => {
                    self.received += 1;
                    if let Err(e) = self.encode(&frame) {
                        if e.is_fatal() {
                            break FinishReason::WriteFailed;
                        }
                    }
                    if self.received >= self.budget {
                        break FinishReason::BudgetExhausted;
                    }
                }
                Ok(ControlMessage::Finish) => break FinishReason::Requested,
                Err(_) => break FinishReason::ProducerDisconnected,
            }
        };

        let (summary, finalize_error) = self.finalize();
        let frames_discarded = drain_late_messages(&receiver);
        drop(receiver);

        log::info!(
            "Recording finished ({:?}): {} encoded, {} failed, {} bytes, {:.2}s",
            finish_reason,
            self.encoded,
            self.failed,
            summary.bytes_written,
            summary.duration_secs
        );

        SessionReport {
            output_path: self.output_path,
            frames_received: self.received,
            frames_encoded: self.encoded,
            frames_failed: self.failed,
            frames_discarded,
            bytes_written: summary.bytes_written,
            duration_secs: summary.duration_secs,
            finish_reason,
            finalize_error,
        }
    }

    fn encode(&mut self, frame: &Frame) -> Result<(), RecordError> {
        match self.sink.write_frame(frame) {
            Ok(()) => {
                self.encoded += 1;
                log::debug!(
                    "Encoded frame {} ({}x{})",
                    self.received,
                    frame.width(),
                    frame.height()
                );
                Ok(())
            }
            Err(e) => {
                self.failed += 1;
                log::error!("Failed to encode frame {}: {}", self.received, e);
                Err(e)
            }
        }
    }

    fn finalize(&mut self) -> (SinkSummary, Option<String>) {
        match self.sink.finalize() {
            Ok(summary) => (summary.unwrap_or_default(), None),
            Err(e) => {
                log::error!("Failed to finalize recording: {}", e);
                (SinkSummary::default(), Some(e.to_string()))
            }
        }
    }
}

/// Count frames that were queued behind the final message
fn drain_late_messages(receiver: &Receiver<ControlMessage>) -> u64 {
    let mut discarded = 0;
    for message in receiver.try_iter() {
        match message {
            ControlMessage::EncodeFrame(_) => {
                discarded += 1;
                let e = RecordError::Protocol("frame received after finalization".into());
                log::warn!("{}", e);
            }
            ControlMessage::Finish => log::debug!("Ignoring redundant finish"),
        }
    }
    discarded
}
