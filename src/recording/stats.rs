//! Session statistics types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a sink reports when it is finalized
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkSummary {
    /// Frames written to the container
    pub frames_written: u64,
    /// Total bytes written to the output
    pub bytes_written: u64,
    /// Media duration in seconds
    pub duration_secs: f64,
}

/// Why an encoding session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// An explicit `Finish` message was processed
    Requested,
    /// The last frame of the budget was processed
    BudgetExhausted,
    /// The producer dropped its handle without finishing
    ProducerDisconnected,
    /// Writing to the container failed and the session was abandoned
    WriteFailed,
}

/// Statistics returned after the encoder thread has finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Output file path, when the sink writes to a file
    pub output_path: Option<PathBuf>,
    /// Frames taken off the queue before finalization
    pub frames_received: u64,
    /// Frames successfully written
    pub frames_encoded: u64,
    /// Frames that failed to encode and were skipped
    pub frames_failed: u64,
    /// Frames still queued after finalization, never encoded
    pub frames_discarded: u64,
    /// Total bytes written to the output
    pub bytes_written: u64,
    /// Media duration in seconds
    pub duration_secs: f64,
    pub finish_reason: FinishReason,
    /// Set when finalization failed; the output was still closed
    pub finalize_error: Option<String>,
}

impl SessionReport {
    /// Calculate the average bitrate achieved
    pub fn avg_bitrate(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.bytes_written as f64 * 8.0) / self.duration_secs
        } else {
            0.0
        }
    }

    /// True when every received frame was written and the trailer was finalized
    pub fn is_clean(&self) -> bool {
        self.finalize_error.is_none()
            && self.frames_failed == 0
            && self.finish_reason != FinishReason::WriteFailed
    }
}
