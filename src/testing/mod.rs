//! Testing utilities for CrabReel
//!
//! Synthetic frames and an in-memory sink so the encoder thread can be
//! exercised without touching openh264 or the filesystem.

pub mod memory_sink;
pub mod synthetic_data;

pub use memory_sink::MemorySink;
pub use synthetic_data::{
    frame_tag, synthetic_frame, tagged_frame, try_synthetic_frame, TAGGED_FRAME_SIZE,
};
