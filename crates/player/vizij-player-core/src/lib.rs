//! Vizij Player Core
//!
//! Hosts an opaque vector-graphics playback engine. The engine module is
//! brought up once by a [`RuntimeLoader`] and shared by every
//! [`PlaybackSession`]; loaded sessions become [`ReadySession`]s that a
//! [`FrameLoop`] advances and draws on each host frame. Engine-owned objects
//! are held in [`Lease`]s so they are released exactly once, in dependency
//! order, on every exit path.

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame_loop;
pub mod layout;
pub mod lifecycle;
pub mod loader;
pub mod runtime;
pub mod session;
pub mod source;

// Re-exports for hosts
pub use config::PlayerConfig;
pub use driver::{Driver, DriverSpec, StateMachineTarget};
pub use engine::{
    Artboard, Engine, EngineHandle, File, LinearAnimationInstance, Renderer, StateMachineInstance,
    Surface,
};
pub use error::{PlayerError, Result};
pub use events::{EventKind, PlayerEvent};
pub use frame_loop::{FrameCallback, FrameClock, FrameLoop, IntervalClock};
pub use layout::{compute_alignment, Aabb, Alignment, Fit, Mat2D};
pub use lifecycle::{Lease, NativeObject};
pub use loader::{LoaderStatus, ModuleSource, RuntimeLoader};
pub use runtime::{PlayerRuntime, SessionHandle};
pub use session::{PlaybackSession, ReadySession, SessionId, SessionOptions, SessionPhase};
pub use source::Fetcher;
#[cfg(feature = "http")]
pub use source::HttpFetcher;
