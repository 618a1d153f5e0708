//! Start/stop control for recordings driven from a render loop
//!
//! The render loop calls [`RecordingController::wants_frame`] on every
//! tick, requests an asynchronous capture when it returns true, and hands
//! the captured frame to [`RecordingController::on_frame_captured`] from
//! the capture completion callback.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use super::worker::{EncodingWorker, RejectReason, SubmitOutcome, WorkerHandle};
use crate::config::RecorderConfig;
use crate::errors::RecordError;
use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordingState {
    Idle,
    Recording,
}

pub struct RecordingController {
    config: RecorderConfig,
    session: Option<WorkerHandle>,
}

impl RecordingController {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn state(&self) -> RecordingState {
        if self.session.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&WorkerHandle> {
        self.session.as_ref()
    }

    /// Build a fresh output path: `<dir>/<prefix>-<hex unix millis>.mp4`
    pub fn next_output_path(&self) -> PathBuf {
        let millis = Utc::now().timestamp_millis();
        self.config
            .output_directory
            .join(format!("{}-{:x}.mp4", self.config.file_prefix, millis))
    }

    /// Start a new recording and return its output path.
    ///
    /// Fails with `RecordError::Protocol` if a recording is already running.
    pub fn start(&mut self) -> Result<PathBuf, RecordError> {
        if self.session.is_some() {
            return Err(RecordError::Protocol("Recording already in progress".into()));
        }

        let path = self.next_output_path();
        let handle = EncodingWorker::start(&path, &self.config)?;
        log::info!("Recording started: {:?}", path);

        self.session = Some(handle);
        Ok(path)
    }

    /// Stop the current recording.
    ///
    /// Queued frames are still encoded. The returned handle can be joined to
    /// wait for the file to be finalized; dropping it returns immediately.
    pub fn stop(&mut self) -> Option<WorkerHandle> {
        let mut handle = self.session.take()?;
        handle.finish();
        log::info!("Recording stopped: {:?}", handle.output_path());
        Some(handle)
    }

    /// Flip between idle and recording
    pub fn toggle(&mut self) -> Result<RecordingState, RecordError> {
        if let Some(handle) = self.stop() {
            handle.detach();
        } else {
            self.start()?;
        }
        Ok(self.state())
    }

    /// True when the render loop should request a capture this tick
    pub fn wants_frame(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(WorkerHandle::accepts_frames)
    }

    /// Deliver a completed capture to the active session
    pub fn on_frame_captured(&mut self, frame: Frame) -> SubmitOutcome {
        match self.session.as_mut() {
            Some(handle) => handle.submit(frame),
            None => {
                log::warn!("Dropping frame captured after recording stopped");
                SubmitOutcome::Rejected(RejectReason::NotRecording)
            }
        }
    }

    /// Per-tick bookkeeping: once the budget is spent, make sure the session
    /// is marked finished. Safe to call every tick.
    pub fn on_tick(&mut self) {
        if let Some(handle) = self.session.as_mut() {
            if handle.remaining() == 0 {
                handle.finish();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_frame;

    fn controller(dir: &std::path::Path, budget: u32) -> RecordingController {
        RecordingController::new(
            RecorderConfig::default()
                .with_output_directory(dir.join("captures"))
                .with_frame_budget(budget),
        )
    }

    #[test]
    fn test_output_path_naming() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path(), 5);

        let path = controller.next_output_path();
        assert_eq!(path.parent().unwrap(), dir.path().join("captures"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("crabreel-record-"));
        assert!(name.ends_with(".mp4"));
        let hex = &name["crabreel-record-".len()..name.len() - 4];
        assert!(i64::from_str_radix(hex, 16).is_ok());
    }

    #[test]
    fn test_start_twice_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path(), 5);

        let path = controller.start().unwrap();
        assert!(path.exists());
        assert!(matches!(controller.start(), Err(RecordError::Protocol(_))));

        controller.stop().unwrap().join().unwrap();
    }

    #[test]
    fn test_frames_rejected_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path(), 5);

        assert!(!controller.wants_frame());
        assert_eq!(
            controller.on_frame_captured(synthetic_frame(0, 16, 16)),
            SubmitOutcome::Rejected(RejectReason::NotRecording)
        );
    }

    #[test]
    fn test_tick_loop_respects_budget() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path(), 4);
        controller.start().unwrap();

        let mut captured = 0;
        for tick in 0..10 {
            controller.on_tick();
            if controller.wants_frame() {
                controller.on_frame_captured(synthetic_frame(tick, 64, 48));
                captured += 1;
            }
        }
        assert_eq!(captured, 4);

        let report = controller.stop().unwrap().join().unwrap();
        assert_eq!(report.frames_encoded, 4);
        assert!(!controller.is_recording());
    }

    #[test]
    fn test_toggle_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = controller(dir.path(), 5);

        assert_eq!(controller.toggle().unwrap(), RecordingState::Recording);
        assert_eq!(controller.toggle().unwrap(), RecordingState::Idle);
        assert_eq!(controller.state(), RecordingState::Idle);
    }

    #[test]
    fn test_failed_start_stays_idle() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut controller =
            RecordingController::new(RecorderConfig::default().with_output_directory(&blocker));
        assert!(matches!(controller.toggle(), Err(RecordError::Io(_))));
        assert_eq!(controller.state(), RecordingState::Idle);
    }
}
