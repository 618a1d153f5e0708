//! Background video recording for CrabReel
//!
//! Frames are produced by a render loop and encoded on a dedicated thread:
//! - openh264 for H.264 encoding
//! - muxide for MP4 muxing
//! - crossbeam-channel for the FIFO hand-off between the two
//!
//! # Example
//! ```rust,ignore
//! use crabreel::recording::EncodingWorker;
//! use crabreel::RecorderConfig;
//!
//! let config = RecorderConfig::default();
//! let mut handle = EncodingWorker::start("captures/out.mp4", &config)?;
//!
//! // From the capture callback:
//! handle.submit(frame);
//!
//! // When done (or drop the handle to finish in the background):
//! let report = handle.join()?;
//! ```

mod controller;
mod encoder;
mod recorder;
mod sink;
mod stats;
mod worker;

pub use controller::{RecordingController, RecordingState};
pub use encoder::{EncodedFrame, H264Encoder};
pub use recorder::{Mp4Recorder, Mp4Settings};
pub use sink::VideoSink;
pub use stats::{FinishReason, SessionReport, SinkSummary};
pub use worker::{
    ControlMessage, EncodingWorker, RejectReason, SubmitOutcome, WorkerHandle, WorkerOptions,
};
