//! CrabReel: background MP4 recording of rendered frames
//!
//! A render loop captures RGBA frames and hands them to a dedicated encoder
//! thread, which writes them as H.264 into an MP4 file in arrival order.
//!
//! # Features
//! - Non-blocking frame submission from the render/capture context
//! - Fixed per-session frame budget with automatic finalization
//! - Idempotent finish; the output file is closed on every exit path
//! - Start/stop controller with timestamped output naming
//! - TOML configuration
//!
//! # Usage
//! ```rust,ignore
//! use crabreel::{RecorderConfig, RecordingController};
//!
//! let mut controller = RecordingController::new(RecorderConfig::default());
//! controller.start()?;
//!
//! // Every render tick:
//! controller.on_tick();
//! if controller.wants_frame() {
//!     // request an async capture; in its callback:
//!     controller.on_frame_captured(frame);
//! }
//!
//! // Later:
//! if let Some(session) = controller.stop() {
//!     let report = session.join()?;
//! }
//! ```
pub mod config;
pub mod errors;
pub mod frame;
pub mod recording;

// Testing utilities - synthetic frames and an in-memory sink
pub mod testing;

// Re-exports for convenience
pub use config::RecorderConfig;
pub use errors::RecordError;
pub use frame::Frame;
pub use recording::{
    EncodingWorker, RecordingController, RecordingState, SessionReport, SubmitOutcome,
    WorkerHandle,
};

/// Initialize logging for the recorder
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabreel=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "crabreel");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }
}
