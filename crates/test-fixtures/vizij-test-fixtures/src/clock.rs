//! Deterministic frame clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use vizij_player_core::{FrameCallback, FrameClock};

/// [`FrameClock`] advanced by hand with [`ManualClock::tick`].
#[derive(Default)]
pub struct ManualClock {
    pending: Mutex<Vec<FrameCallback>>,
    requests: AtomicUsize,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire every callback requested before this call. Callbacks requested
    /// while firing wait for the next tick. Returns how many fired.
    pub fn tick(&self, timestamp_ms: f64) -> usize {
        let due = std::mem::take(&mut *self.pending.lock().unwrap());
        let fired = due.len();
        for callback in due {
            callback(timestamp_ms);
        }
        fired
    }

    /// Callbacks waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Total `request_frame` calls so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl FrameClock for ManualClock {
    fn request_frame(&self, callback: FrameCallback) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().push(callback);
    }
}
