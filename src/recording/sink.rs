//! Destination seam for the encoder thread

use super::stats::SinkSummary;
use crate::errors::RecordError;
use crate::frame::Frame;

/// Something that turns a stream of frames into an output artifact.
///
/// A sink lives entirely on the encoder thread, so it does not need to be
/// `Send`. Implementations must make `finalize` idempotent: the first call
/// flushes and closes the output and returns its summary, later calls do
/// nothing and return `Ok(None)`. The output must be closed even when the
/// first call returns an error.
pub trait VideoSink {
    /// Encode and append one frame.
    ///
    /// `RecordError::Encoder` means the frame was skipped and the sink is
    /// still usable. `RecordError::Io` means the output is broken.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), RecordError>;

    /// Flush, write any trailer, and close the output
    fn finalize(&mut self) -> Result<Option<SinkSummary>, RecordError>;

    fn is_finalized(&self) -> bool;
}

impl<S: VideoSink + ?Sized> VideoSink for Box<S> {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), RecordError> {
        (**self).write_frame(frame)
    }

    fn finalize(&mut self) -> Result<Option<SinkSummary>, RecordError> {
        (**self).finalize()
    }

    fn is_finalized(&self) -> bool {
        (**self).is_finalized()
    }
}
