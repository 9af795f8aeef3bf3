//! Animation drivers attached to a session's artboard.

use serde::{Deserialize, Serialize};

use crate::engine::{Artboard, LinearAnimationInstance, StateMachineInstance};
use crate::error::{PlayerError, Result};
use crate::lifecycle::Lease;

/// Selects a state machine on the artboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateMachineTarget {
    Index(usize),
    Name(String),
}

/// Declarative description of a driver to attach at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "target", rename_all = "snake_case")]
pub enum DriverSpec {
    StateMachine(StateMachineTarget),
    LinearAnimation(String),
}

/// A live driver owned by a session.
pub enum Driver {
    StateMachine(Lease<dyn StateMachineInstance>),
    LinearAnimation(Lease<dyn LinearAnimationInstance>),
}

impl Driver {
    /// Instantiate the driver described by `spec` against `artboard`.
    pub fn instantiate(artboard: &dyn Artboard, spec: &DriverSpec) -> Result<Self> {
        match spec {
            DriverSpec::StateMachine(StateMachineTarget::Index(index)) => artboard
                .state_machine_by_index(*index)
                .map(|sm| Driver::StateMachine(Lease::new(sm)))
                .ok_or_else(|| PlayerError::UnknownStateMachine(format!("#{index}"))),
            DriverSpec::StateMachine(StateMachineTarget::Name(name)) => artboard
                .state_machine_by_name(name)
                .map(|sm| Driver::StateMachine(Lease::new(sm)))
                .ok_or_else(|| PlayerError::UnknownStateMachine(name.clone())),
            DriverSpec::LinearAnimation(name) => artboard
                .animation_by_name(name)
                .map(|anim| Driver::LinearAnimation(Lease::new(anim)))
                .ok_or_else(|| PlayerError::UnknownAnimation(name.clone())),
        }
    }

    /// Advance the driver. Must run before the artboard's own advance so the
    /// artboard consumes this frame's inputs.
    pub fn advance(&mut self, artboard: &mut dyn Artboard, seconds: f64) {
        match self {
            Driver::StateMachine(sm) => sm.advance(artboard, seconds),
            Driver::LinearAnimation(anim) => {
                anim.advance(seconds);
                anim.apply(artboard, 1.0);
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Driver::StateMachine(sm) => sm.name(),
            Driver::LinearAnimation(anim) => anim.name(),
        }
    }

    pub fn is_state_machine(&self) -> bool {
        matches!(self, Driver::StateMachine(_))
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Driver::StateMachine(_) => f.debug_tuple("StateMachine").field(&self.name()).finish(),
            Driver::LinearAnimation(_) => f
                .debug_tuple("LinearAnimation")
                .field(&self.name())
                .finish(),
        }
    }
}
