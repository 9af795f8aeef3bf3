//! Per-frame advance/draw scheduling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, trace};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::session::{ReadySession, SessionId};

/// Callback receiving the frame timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64) + Send>;

/// Host frame-scheduling primitive. Each requested callback fires once, on
/// the next display refresh, with a non-decreasing timestamp.
pub trait FrameClock: Send + Sync {
    fn request_frame(&self, callback: FrameCallback);
}

struct Entry {
    session: ReadySession,
    playing: bool,
    last_timestamp: Option<f64>,
}

#[derive(Default)]
struct LoopState {
    entries: Vec<Entry>,
    running: bool,
    scheduled: bool,
    frames: u64,
}

/// Drives every registered session once per frame.
#[derive(Clone)]
pub struct FrameLoop {
    clock: Arc<dyn FrameClock>,
    state: Arc<Mutex<LoopState>>,
}

impl FrameLoop {
    pub fn new(clock: Arc<dyn FrameClock>) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(LoopState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a ready session. Paused sessions are kept but not advanced.
    pub fn add(&self, session: ReadySession, playing: bool) -> SessionId {
        let id = session.id();
        self.lock().entries.push(Entry {
            session,
            playing,
            last_timestamp: None,
        });
        id
    }

    /// Detach a session and hand ownership back to the caller.
    pub fn remove(&self, id: SessionId) -> Option<ReadySession> {
        let mut state = self.lock();
        let index = state.entries.iter().position(|e| e.session.id() == id)?;
        Some(state.entries.remove(index).session)
    }

    pub fn play(&self, id: SessionId) -> bool {
        self.set_playing(id, true)
    }

    /// Pausing forgets the last timestamp so resuming starts from elapsed 0.
    pub fn pause(&self, id: SessionId) -> bool {
        self.set_playing(id, false)
    }

    fn set_playing(&self, id: SessionId, playing: bool) -> bool {
        let mut state = self.lock();
        match state.entries.iter_mut().find(|e| e.session.id() == id) {
            Some(entry) => {
                entry.playing = playing;
                if !playing {
                    entry.last_timestamp = None;
                }
                true
            }
            None => false,
        }
    }

    pub fn is_playing(&self, id: SessionId) -> Option<bool> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.session.id() == id)
            .map(|e| e.playing)
    }

    /// Inspect or adjust a registered session.
    pub fn with_session<R>(&self, id: SessionId, f: impl FnOnce(&mut ReadySession) -> R) -> Option<R> {
        let mut state = self.lock();
        state
            .entries
            .iter_mut()
            .find(|e| e.session.id() == id)
            .map(|e| f(&mut e.session))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames run since the loop was created.
    pub fn frames(&self) -> u64 {
        self.lock().frames
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Start requesting frames. A no-op while already running.
    pub fn start(&self) {
        let mut state = self.lock();
        state.running = true;
        if state.scheduled {
            return;
        }
        state.scheduled = true;
        drop(state);
        debug!("frame loop started");
        self.request_next();
    }

    /// Stop after the current frame. The pending callback still fires but
    /// neither draws nor re-registers.
    pub fn stop(&self) {
        self.lock().running = false;
        debug!("frame loop stopped");
    }

    /// Release every registered session.
    pub fn dispose_all(&self) {
        let entries = std::mem::take(&mut self.lock().entries);
        for entry in entries {
            entry.session.dispose();
        }
    }

    fn request_next(&self) {
        let this = self.clone();
        self.clock
            .request_frame(Box::new(move |timestamp| this.on_frame(timestamp)));
    }

    fn on_frame(&self, timestamp: f64) {
        let mut state = self.lock();
        if !state.running {
            state.scheduled = false;
            return;
        }
        for entry in state.entries.iter_mut().filter(|e| e.playing) {
            let elapsed = entry
                .last_timestamp
                .map_or(0.0, |last| ((timestamp - last) / 1000.0).max(0.0));
            entry.last_timestamp = Some(timestamp);
            entry.session.advance_and_draw(elapsed);
        }
        state.frames += 1;
        trace!("frame {} at {timestamp:.3}ms", state.frames);
        drop(state);
        self.request_next();
    }
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FrameLoop")
            .field("sessions", &state.entries.len())
            .field("running", &state.running)
            .field("frames", &state.frames)
            .finish()
    }
}

/// [`FrameClock`] ticking on a Tokio interval, for hosts without a display
/// refresh callback.
pub struct IntervalClock {
    pending: Arc<Mutex<Vec<FrameCallback>>>,
    task: JoinHandle<()>,
}

impl IntervalClock {
    /// Spawn the ticking task on the current runtime.
    pub fn spawn(period: Duration) -> Self {
        let pending: Arc<Mutex<Vec<FrameCallback>>> = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::clone(&pending);
        let task = tokio::spawn(async move {
            let origin = Instant::now();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let timestamp = origin.elapsed().as_secs_f64() * 1000.0;
                let callbacks =
                    std::mem::take(&mut *queue.lock().unwrap_or_else(PoisonError::into_inner));
                for callback in callbacks {
                    callback(timestamp);
                }
            }
        });
        Self { pending, task }
    }
}

impl FrameClock for IntervalClock {
    fn request_frame(&self, callback: FrameCallback) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }
}

impl Drop for IntervalClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}
