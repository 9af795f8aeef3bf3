//! Capability surface of the playback engine.
//!
//! The engine is an opaque, pre-built module: it parses files, owns scene
//! graphs and rasterizes. The player only drives it through these traits.
//! Every object the engine hands out is a [`NativeObject`] and is wrapped in a
//! [`crate::lifecycle::Lease`] by its owner.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{Aabb, Alignment, Fit};
use crate::lifecycle::NativeObject;

/// Shared, read-only handle to a loaded engine module.
pub type EngineHandle = Arc<dyn Engine>;

/// A drawing surface provided by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub id: String,
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub fn new(id: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    /// Destination bounds for alignment.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_size(self.width, self.height)
    }
}

/// Factory operations of the loaded module.
pub trait Engine: Send + Sync {
    /// Parse a file; `None` when the engine rejects the bytes.
    fn load(&self, bytes: &[u8]) -> Option<Box<dyn File>>;

    /// Create a renderer bound to `surface`.
    fn make_renderer(&self, surface: &Surface, prefer_offscreen: bool) -> Result<Box<dyn Renderer>>;
}

pub trait File: NativeObject + Send {
    fn default_artboard(&self) -> Option<Box<dyn Artboard>>;

    fn artboard_by_name(&self, name: &str) -> Option<Box<dyn Artboard>>;
}

/// Root of a scene; advanced and drawn once per frame.
pub trait Artboard: NativeObject + Send {
    fn name(&self) -> &str;

    /// Natural bounds of the artboard content.
    fn bounds(&self) -> Aabb;

    fn advance(&mut self, seconds: f64);

    fn draw(&self, renderer: &mut dyn Renderer);

    fn animation_by_name(&self, name: &str) -> Option<Box<dyn LinearAnimationInstance>>;

    fn state_machine_by_index(&self, index: usize) -> Option<Box<dyn StateMachineInstance>>;

    fn state_machine_by_name(&self, name: &str) -> Option<Box<dyn StateMachineInstance>>;
}

/// Drawing-command sink bound to one surface.
pub trait Renderer: NativeObject + Send {
    fn clear(&mut self);

    fn save(&mut self);

    fn restore(&mut self);

    fn align(&mut self, fit: Fit, alignment: Alignment, frame: Aabb, content: Aabb);

    fn flush(&mut self);
}

pub trait LinearAnimationInstance: NativeObject + Send {
    fn name(&self) -> &str;

    fn advance(&mut self, seconds: f64);

    /// Apply the current pose to `artboard` at the given mix weight.
    fn apply(&mut self, artboard: &mut dyn Artboard, mix: f32);
}

pub trait StateMachineInstance: NativeObject + Send {
    fn name(&self) -> &str;

    /// Advance transitions; results are consumed by the artboard's next advance.
    fn advance(&mut self, artboard: &mut dyn Artboard, seconds: f64);
}
