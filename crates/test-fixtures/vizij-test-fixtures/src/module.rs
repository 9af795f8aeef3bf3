//! Scripted engine bring-up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use vizij_player_core::{EngineHandle, ModuleSource, PlayerError};

use crate::engine::FixtureEngine;

enum Behavior {
    Ready,
    Gated(watch::Receiver<bool>),
    /// Fail the first `failures` attempts, then succeed.
    Flaky(usize),
    Failing(String),
    Hanging,
}

/// [`ModuleSource`] whose bring-up is scripted by the test.
pub struct FixtureModule {
    engine: EngineHandle,
    behavior: Behavior,
    instantiations: AtomicUsize,
}

/// Releases a gated module's pending bring-up.
pub struct ModuleGate(watch::Sender<bool>);

impl ModuleGate {
    pub fn open(&self) {
        self.0.send_replace(true);
    }
}

impl FixtureModule {
    fn with_behavior(engine: &FixtureEngine, behavior: Behavior) -> Self {
        Self {
            engine: Arc::new(engine.clone()),
            behavior,
            instantiations: AtomicUsize::new(0),
        }
    }

    /// Resolves immediately.
    pub fn ready(engine: &FixtureEngine) -> Self {
        Self::with_behavior(engine, Behavior::Ready)
    }

    /// Resolves once the returned gate is opened.
    pub fn gated(engine: &FixtureEngine) -> (Self, ModuleGate) {
        let (tx, rx) = watch::channel(false);
        (
            Self::with_behavior(engine, Behavior::Gated(rx)),
            ModuleGate(tx),
        )
    }

    pub fn flaky(engine: &FixtureEngine, failures: usize) -> Self {
        Self::with_behavior(engine, Behavior::Flaky(failures))
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_behavior(&FixtureEngine::new(), Behavior::Failing(reason.into()))
    }

    /// Never resolves.
    pub fn hanging() -> Self {
        Self::with_behavior(&FixtureEngine::new(), Behavior::Hanging)
    }

    /// Handle every successful bring-up returns.
    pub fn engine(&self) -> EngineHandle {
        Arc::clone(&self.engine)
    }

    /// Number of times `instantiate` has been entered.
    pub fn instantiations(&self) -> usize {
        self.instantiations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModuleSource for FixtureModule {
    async fn instantiate(&self) -> vizij_player_core::Result<EngineHandle> {
        let attempt = self.instantiations.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.behavior {
            Behavior::Ready => Ok(self.engine()),
            Behavior::Gated(gate) => {
                let mut gate = gate.clone();
                let opened = gate.wait_for(|open| *open).await.is_ok();
                if opened {
                    Ok(self.engine())
                } else {
                    Err(PlayerError::ModuleInit("gate dropped".into()))
                }
            }
            Behavior::Flaky(failures) if attempt <= *failures => Err(PlayerError::ModuleInit(
                format!("attempt {attempt} failed"),
            )),
            Behavior::Flaky(_) => Ok(self.engine()),
            Behavior::Failing(reason) => Err(PlayerError::ModuleInit(reason.clone())),
            Behavior::Hanging => std::future::pending().await,
        }
    }
}
