use thiserror::Error;

/// Errors raised while starting, feeding, or finalizing a recording.
///
/// Only errors from [`EncodingWorker::start`](crate::recording::EncodingWorker::start)
/// and config loading reach the caller directly. Anything that goes wrong on
/// the encoder thread is logged and summarized in the session report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Output directory/file creation, write, flush, or close failure
    #[error("IO error: {0}")]
    Io(String),
    /// Malformed frame or codec-internal failure
    #[error("Encoding error: {0}")]
    Encoder(String),
    /// Lifecycle misuse, e.g. a message arriving after finalization
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RecordError {
    /// True for errors that leave the output container unusable for further writes.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecordError::Io(_))
    }
}

impl From<std::io::Error> for RecordError {
    fn from(e: std::io::Error) -> Self {
        RecordError::Io(e.to_string())
    }
}
