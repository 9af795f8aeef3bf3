//! Load-once, fan-out access to the engine module.
//!
//! The module is brought up asynchronously exactly once. Every request made
//! while it is loading is queued and answered in FIFO order when it resolves;
//! requests made after it is ready are answered before `ensure_loaded` returns.
//! A failed or timed-out bring-up rejects every queued waiter with the same
//! error and leaves the loader ready to retry on the next request.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::config::PlayerConfig;
use crate::engine::EngineHandle;
use crate::error::{PlayerError, Result};

/// Asynchronous bring-up of the engine module.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`PlayerError::ModuleInit`] when the module cannot start.
    async fn instantiate(&self) -> Result<EngineHandle>;
}

type Waiter = Box<dyn FnOnce(Result<EngineHandle>) + Send>;

/// Run one waiter. A panicking waiter is logged and does not stop the rest of
/// the queue from being answered.
fn answer(waiter: Waiter, outcome: Result<EngineHandle>) {
    if panic::catch_unwind(AssertUnwindSafe(move || waiter(outcome))).is_err() {
        error!("engine module waiter panicked");
    }
}

enum LoaderState {
    Unloaded,
    Loading {
        generation: u64,
        waiters: VecDeque<Waiter>,
    },
    Ready(EngineHandle),
    Failed(PlayerError),
}

/// Observable loader status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoaderStatus {
    Unloaded,
    Loading { queued: usize },
    Ready,
    Failed(PlayerError),
}

struct Inner {
    source: Arc<dyn ModuleSource>,
    timeout: Option<Duration>,
    state: Mutex<LoaderState>,
    attempts: AtomicU64,
}

/// Cloneable handle to a shared loader.
#[derive(Clone)]
pub struct RuntimeLoader {
    inner: Arc<Inner>,
}

static GLOBAL: OnceCell<RuntimeLoader> = OnceCell::new();

impl RuntimeLoader {
    pub fn new(source: Arc<dyn ModuleSource>, config: &PlayerConfig) -> Self {
        Self::with_timeout(source, config.load_timeout())
    }

    pub fn with_timeout(source: Arc<dyn ModuleSource>, timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                timeout,
                state: Mutex::new(LoaderState::Unloaded),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Install `loader` as the process-wide instance.
    pub fn install_global(loader: RuntimeLoader) -> Result<&'static RuntimeLoader> {
        GLOBAL
            .set(loader)
            .map_err(|_| PlayerError::GlobalLoaderInstalled)?;
        GLOBAL.get().ok_or(PlayerError::GlobalLoaderInstalled)
    }

    pub fn global() -> Option<&'static RuntimeLoader> {
        GLOBAL.get()
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `callback` with the module handle once it is available.
    ///
    /// If the module is ready the callback runs before this call returns.
    /// Starting a load spawns onto the current Tokio runtime; outside one the
    /// callback is rejected with [`PlayerError::ModuleInit`] and the loader
    /// stays as it was.
    pub fn ensure_loaded<F>(&self, callback: F)
    where
        F: FnOnce(Result<EngineHandle>) + Send + 'static,
    {
        let mut state = self.lock();
        let ready = match &mut *state {
            LoaderState::Ready(handle) => Some(Arc::clone(handle)),
            LoaderState::Loading { waiters, .. } => {
                waiters.push_back(Box::new(callback));
                return;
            }
            LoaderState::Unloaded | LoaderState::Failed(_) => None,
        };
        if let Some(handle) = ready {
            drop(state);
            callback(Ok(handle));
            return;
        }

        // Nothing could answer the queue without a runtime to run the bring-up.
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                drop(state);
                warn!("engine module requested outside a Tokio runtime");
                callback(Err(PlayerError::ModuleInit(format!("no Tokio runtime: {err}"))));
                return;
            }
        };

        // Enter Loading before the first suspension so a concurrent caller queues.
        let generation = self.inner.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let mut waiters: VecDeque<Waiter> = VecDeque::new();
        waiters.push_back(Box::new(callback));
        *state = LoaderState::Loading {
            generation,
            waiters,
        };
        drop(state);
        self.spawn_initialization(&runtime, generation);
    }

    /// Await the module handle.
    pub async fn load(&self) -> Result<EngineHandle> {
        let (tx, rx) = oneshot::channel();
        self.ensure_loaded(move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await
            .unwrap_or_else(|_| Err(PlayerError::ModuleInit("loader dropped the request".into())))
    }

    fn spawn_initialization(&self, runtime: &Handle, generation: u64) {
        let loader = self.clone();
        let source = Arc::clone(&self.inner.source);
        let timeout = self.inner.timeout;
        info!("initializing engine module (attempt {generation})");
        runtime.spawn(async move {
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, source.instantiate())
                    .await
                    .unwrap_or_else(|_| {
                        Err(PlayerError::LoadTimedOut {
                            timeout_ms: limit.as_millis() as u64,
                        })
                    }),
                None => source.instantiate().await,
            };
            loader.complete(generation, outcome);
        });
    }

    fn complete(&self, generation: u64, outcome: Result<EngineHandle>) {
        match outcome {
            Ok(handle) => {
                info!("engine module ready (attempt {generation})");
                // Drain one waiter at a time so callbacks registered while
                // draining queue behind the remaining waiters.
                loop {
                    let mut state = self.lock();
                    let waiter = match &mut *state {
                        LoaderState::Loading {
                            generation: current,
                            waiters,
                        } if *current == generation => waiters.pop_front(),
                        _ => {
                            debug!("discarding superseded module load (attempt {generation})");
                            return;
                        }
                    };
                    match waiter {
                        Some(waiter) => {
                            drop(state);
                            answer(waiter, Ok(Arc::clone(&handle)));
                        }
                        None => {
                            *state = LoaderState::Ready(handle);
                            return;
                        }
                    }
                }
            }
            Err(err) => {
                error!("engine module failed to initialize: {err}");
                let waiters = {
                    let mut state = self.lock();
                    match &*state {
                        LoaderState::Loading {
                            generation: current,
                            ..
                        } if *current == generation => {}
                        _ => return,
                    }
                    match std::mem::replace(&mut *state, LoaderState::Failed(err.clone())) {
                        LoaderState::Loading { waiters, .. } => waiters,
                        _ => VecDeque::new(),
                    }
                };
                for waiter in waiters {
                    answer(waiter, Err(err.clone()));
                }
            }
        }
    }

    pub fn status(&self) -> LoaderStatus {
        match &*self.lock() {
            LoaderState::Unloaded => LoaderStatus::Unloaded,
            LoaderState::Loading { waiters, .. } => LoaderStatus::Loading {
                queued: waiters.len(),
            },
            LoaderState::Ready(_) => LoaderStatus::Ready,
            LoaderState::Failed(err) => LoaderStatus::Failed(err.clone()),
        }
    }

    /// Number of initialization attempts started so far.
    pub fn initializations(&self) -> u64 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Forget the cached module so the next request loads it again.
    ///
    /// Queued waiters are rejected with [`PlayerError::LoaderReset`]; an
    /// in-flight attempt still runs but its result is discarded.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset(&self) {
        let previous = std::mem::replace(&mut *self.lock(), LoaderState::Unloaded);
        if let LoaderState::Loading { waiters, .. } = previous {
            for waiter in waiters {
                answer(waiter, Err(PlayerError::LoaderReset));
            }
        }
    }
}

impl std::fmt::Debug for RuntimeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLoader")
            .field("status", &self.status())
            .field("initializations", &self.initializations())
            .finish()
    }
}
