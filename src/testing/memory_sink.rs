//! In-memory [`VideoSink`] with failure injection

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::errors::RecordError;
use crate::frame::Frame;
use crate::recording::{SinkSummary, VideoSink};

#[derive(Default)]
struct State {
    frames: Vec<Frame>,
    write_attempts: usize,
    finalize_calls: u32,
    close_count: u32,
    closed: bool,
    writes_held: bool,
}

#[derive(Clone, Default)]
struct Faults {
    fail_frame: Option<usize>,
    fail_writes_after: Option<usize>,
    fail_finalize: bool,
}

/// Collects frames in memory.
///
/// Clones share state, so a test keeps one clone as a probe while the other
/// is moved onto the encoder thread.
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<(Mutex<State>, Condvar)>,
    faults: Faults,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the write attempt at `index` (0-based) with an encoder error
    pub fn fail_frame(mut self, index: usize) -> Self {
        self.faults.fail_frame = Some(index);
        self
    }

    /// Fail every write attempt from `index` on with an IO error
    pub fn fail_writes_after(mut self, index: usize) -> Self {
        self.faults.fail_writes_after = Some(index);
        self
    }

    /// Make the first finalize return an IO error (the sink still closes)
    pub fn fail_finalize(mut self) -> Self {
        self.faults.fail_finalize = true;
        self
    }

    /// Block every write until [`release_writes`](Self::release_writes)
    pub fn hold_writes(self) -> Self {
        self.lock().writes_held = true;
        self
    }

    /// Let held writes proceed
    pub fn release_writes(&self) {
        let (lock, cv) = &*self.state;
        lock.lock().expect("lock poisoned").writes_held = false;
        cv.notify_all();
    }

    /// Frames written so far, in write order
    pub fn frames(&self) -> Vec<Frame> {
        self.lock().frames.clone()
    }

    pub fn finalize_calls(&self) -> u32 {
        self.lock().finalize_calls
    }

    /// How many times the underlying output was closed
    pub fn close_count(&self) -> u32 {
        self.lock().close_count
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Block until the sink is closed or `timeout` passes
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let (lock, cv) = &*self.state;
        let deadline = Instant::now() + timeout;
        let mut g = lock.lock().expect("lock poisoned");
        while !g.closed {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (ng, _) = cv.wait_timeout(g, deadline - now).expect("lock poisoned");
            g = ng;
        }
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.0.lock().expect("lock poisoned")
    }
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), RecordError> {
        let (lock, cv) = &*self.state;
        let mut g = lock.lock().expect("lock poisoned");
        while g.writes_held {
            g = cv.wait(g).expect("lock poisoned");
        }
        if g.closed {
            return Err(RecordError::Protocol("write after close".into()));
        }

        let attempt = g.write_attempts;
        g.write_attempts += 1;

        if self.faults.fail_writes_after.is_some_and(|n| attempt >= n) {
            return Err(RecordError::Io(format!("injected write failure at {}", attempt)));
        }
        if self.faults.fail_frame == Some(attempt) {
            return Err(RecordError::Encoder(format!("injected bad frame at {}", attempt)));
        }

        g.frames.push(frame.clone());
        Ok(())
    }

    fn finalize(&mut self) -> Result<Option<SinkSummary>, RecordError> {
        let (lock, cv) = &*self.state;
        let mut g = lock.lock().expect("lock poisoned");
        g.finalize_calls += 1;
        if g.closed {
            return Ok(None);
        }

        g.closed = true;
        g.close_count += 1;
        cv.notify_all();

        if self.faults.fail_finalize {
            return Err(RecordError::Io("injected finalize failure".into()));
        }

        let bytes: usize = g.frames.iter().map(|f| f.data().len()).sum();
        Ok(Some(SinkSummary {
            frames_written: g.frames.len() as u64,
            bytes_written: bytes as u64,
            duration_secs: g.frames.len() as f64 / 25.0,
        }))
    }

    fn is_finalized(&self) -> bool {
        self.lock().closed
    }
}
