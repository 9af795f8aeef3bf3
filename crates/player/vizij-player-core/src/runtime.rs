//! Host-facing facade: loader + fetcher + frame loop.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

use crate::frame_loop::FrameLoop;
use crate::loader::RuntimeLoader;
use crate::session::{PlaybackSession, SessionId, SessionPhase};
use crate::source::Fetcher;

/// Observes a started session's phase.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: SessionId,
    phase: watch::Receiver<SessionPhase>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.borrow().clone()
    }

    /// Wait until the session is ready or has failed.
    pub async fn settled(&mut self) -> SessionPhase {
        if let Ok(phase) = self
            .phase
            .wait_for(|p| matches!(p, SessionPhase::Ready | SessionPhase::Failed(_)))
            .await
        {
            return phase.clone();
        }
        // The loading task went away without reporting.
        self.phase()
    }
}

/// Starts sessions against a shared loader and drives them on one frame loop.
#[derive(Clone)]
pub struct PlayerRuntime {
    loader: RuntimeLoader,
    fetcher: Arc<dyn Fetcher>,
    frame_loop: FrameLoop,
}

impl PlayerRuntime {
    pub fn new(loader: RuntimeLoader, fetcher: Arc<dyn Fetcher>, frame_loop: FrameLoop) -> Self {
        Self {
            loader,
            fetcher,
            frame_loop,
        }
    }

    pub fn loader(&self) -> &RuntimeLoader {
        &self.loader
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    /// Load `session` once the module is available and register it with the
    /// frame loop. Autoplay sessions start the loop; others are added paused.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, session: PlaybackSession) -> SessionHandle {
        let id = session.id();
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Unloaded);
        let fetcher = Arc::clone(&self.fetcher);
        let frame_loop = self.frame_loop.clone();

        self.loader.ensure_loaded(move |outcome| {
            let engine = match outcome {
                Ok(engine) => engine,
                Err(err) => {
                    warn!("session {id} cannot load: {err}");
                    phase_tx.send_replace(SessionPhase::Failed(err));
                    return;
                }
            };
            phase_tx.send_replace(SessionPhase::Loading);
            tokio::spawn(async move {
                match session.load(&*engine, &*fetcher).await {
                    Ok(ready) => {
                        let autoplay = ready.autoplay();
                        info!("session {id} ready on surface '{}'", ready.surface().id);
                        frame_loop.add(ready, autoplay);
                        if autoplay {
                            frame_loop.start();
                        }
                        phase_tx.send_replace(SessionPhase::Ready);
                    }
                    Err(err) => {
                        warn!("session {id} failed to load: {err}");
                        phase_tx.send_replace(SessionPhase::Failed(err));
                    }
                }
            });
        });

        SessionHandle { id, phase: phase_rx }
    }

    /// Stop the frame loop and release every session it owns.
    pub fn shutdown(&self) {
        self.frame_loop.stop();
        self.frame_loop.dispose_all();
    }
}

impl std::fmt::Debug for PlayerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerRuntime")
            .field("loader", &self.loader)
            .field("frame_loop", &self.frame_loop)
            .finish()
    }
}
