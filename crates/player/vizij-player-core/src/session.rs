//! Playback sessions: one artboard rendered onto one surface.
//!
//! A [`PlaybackSession`] only records intent. Loading consumes it and yields a
//! [`ReadySession`], the only type that can advance and draw, so a frame can
//! never be requested before initialization completes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use log::{debug, trace};

use crate::config::PlayerConfig;
use crate::driver::{Driver, DriverSpec, StateMachineTarget};
use crate::engine::{Artboard, Engine, File, Renderer, Surface};
use crate::error::{PlayerError, Result};
use crate::events::{EventBus, EventKind, PlayerEvent};
use crate::layout::{compute_alignment, Alignment, Fit, Mat2D};
use crate::lifecycle::Lease;
use crate::source::Fetcher;

pub type SessionId = Uuid;

/// Construction options for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub surface: Surface,
    /// Remote locator of the file.
    #[serde(default)]
    pub source: Option<String>,
    /// In-memory file contents.
    #[serde(default)]
    pub buffer: Option<Vec<u8>>,
    #[serde(default)]
    pub autoplay: bool,
    #[serde(default)]
    pub fit: Fit,
    #[serde(default)]
    pub alignment: Alignment,
    /// Artboard to play; the file's default artboard when unset.
    #[serde(default)]
    pub artboard: Option<String>,
    #[serde(default)]
    pub drivers: Vec<DriverSpec>,
    #[serde(default)]
    pub prefer_offscreen: bool,
}

impl SessionOptions {
    pub fn new(surface: Surface) -> Self {
        Self::from_config(surface, &PlayerConfig::default())
    }

    pub fn from_config(surface: Surface, config: &PlayerConfig) -> Self {
        Self {
            surface,
            source: None,
            buffer: None,
            autoplay: false,
            fit: config.fit,
            alignment: config.alignment,
            artboard: None,
            drivers: Vec::new(),
            prefer_offscreen: config.prefer_offscreen,
        }
    }

    pub fn with_source(mut self, locator: impl Into<String>) -> Self {
        self.source = Some(locator.into());
        self
    }

    pub fn with_buffer(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.buffer = Some(bytes.into());
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_fit(mut self, fit: Fit) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_artboard(mut self, name: impl Into<String>) -> Self {
        self.artboard = Some(name.into());
        self
    }

    /// Drive the artboard with the named state machine, replacing other drivers.
    pub fn with_state_machine(mut self, name: impl Into<String>) -> Self {
        self.drivers = vec![DriverSpec::StateMachine(StateMachineTarget::Name(
            name.into(),
        ))];
        self
    }

    /// Drive the artboard with the named linear animation, replacing other drivers.
    pub fn with_animation(mut self, name: impl Into<String>) -> Self {
        self.drivers = vec![DriverSpec::LinearAnimation(name.into())];
        self
    }

    /// Attach an additional driver; all drivers advance every frame.
    pub fn add_driver(mut self, spec: DriverSpec) -> Self {
        self.drivers.push(spec);
        self
    }
}

/// Where a session is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Unloaded,
    Loading,
    Ready,
    Failed(PlayerError),
}

/// A session that has not been loaded yet.
#[derive(Debug)]
pub struct PlaybackSession {
    id: SessionId,
    options: SessionOptions,
    events: EventBus,
}

impl PlaybackSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            options,
            events: EventBus::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn on<F>(&mut self, kind: EventKind, subscriber: F)
    where
        F: FnMut(&PlayerEvent) + Send + 'static,
    {
        self.events.subscribe(kind, Box::new(subscriber));
    }

    /// Subscribe to the load event; the callback receives the source locator.
    pub fn on_load<F>(&mut self, mut subscriber: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on(EventKind::Load, move |event| {
            let PlayerEvent::Load { source } = event;
            subscriber(source);
        });
    }

    /// Load from whichever source the options name.
    pub async fn load(mut self, engine: &dyn Engine, fetcher: &dyn Fetcher) -> Result<ReadySession> {
        match (self.options.source.take(), self.options.buffer.take()) {
            (Some(_), Some(_)) => Err(PlayerError::Configuration(
                "both a source locator and a buffer were supplied".into(),
            )),
            (None, None) => Err(PlayerError::Configuration("missing source".into())),
            (Some(locator), None) => self.load_from_source(engine, fetcher, &locator).await,
            (None, Some(buffer)) => self.load_from_bytes(engine, &buffer),
        }
    }

    /// Fetch `locator` and load the returned bytes.
    pub async fn load_from_source(
        self,
        engine: &dyn Engine,
        fetcher: &dyn Fetcher,
        locator: &str,
    ) -> Result<ReadySession> {
        debug!("session {} fetching {locator}", self.id);
        let bytes = fetcher.fetch(locator).await?;
        self.load_with_origin(engine, &bytes, locator)
    }

    pub fn load_from_bytes(self, engine: &dyn Engine, bytes: &[u8]) -> Result<ReadySession> {
        self.load_with_origin(engine, bytes, "")
    }

    fn load_with_origin(mut self, engine: &dyn Engine, bytes: &[u8], origin: &str) -> Result<ReadySession> {
        let file: Lease<dyn File> = engine
            .load(bytes)
            .map(Lease::new)
            .ok_or(PlayerError::BadData)?;
        self.events.emit(&PlayerEvent::Load {
            source: origin.to_string(),
        });
        self.initialize(engine, file)
    }

    /// Acquire artboard, drivers and renderer, then draw the first frame.
    /// On error everything acquired so far is released in reverse order.
    fn initialize(self, engine: &dyn Engine, file: Lease<dyn File>) -> Result<ReadySession> {
        let options = self.options;
        let artboard = match &options.artboard {
            Some(name) => file.artboard_by_name(name),
            None => file.default_artboard(),
        }
        .map(Lease::new)
        .ok_or_else(|| PlayerError::MissingArtboard(options.artboard.clone()))?;

        let drivers = options
            .drivers
            .iter()
            .map(|spec| Driver::instantiate(&*artboard, spec))
            .collect::<Result<Vec<_>>>()?;

        let renderer = Lease::new(engine.make_renderer(&options.surface, options.prefer_offscreen)?);

        let mut ready = ReadySession {
            renderer,
            drivers,
            artboard,
            file,
            id: self.id,
            surface: options.surface,
            fit: options.fit,
            alignment: options.alignment,
            autoplay: options.autoplay,
            frames_rendered: 0,
            elapsed_total: 0.0,
            last_elapsed: 0.0,
        };
        ready.advance_and_draw(0.0);
        debug!(
            "session {} ready: artboard '{}' with {} driver(s)",
            ready.id,
            ready.artboard.name(),
            ready.drivers.len()
        );
        Ok(ready)
    }
}

/// Clears and saves on entry, restores on drop.
struct SavedFrame<'a> {
    renderer: &'a mut dyn Renderer,
}

impl<'a> SavedFrame<'a> {
    fn enter(renderer: &'a mut dyn Renderer) -> Self {
        renderer.clear();
        renderer.save();
        Self { renderer }
    }
}

impl Drop for SavedFrame<'_> {
    fn drop(&mut self) {
        self.renderer.restore();
    }
}

/// A loaded session. Owns its native objects until dropped.
pub struct ReadySession {
    // Field order is release order.
    renderer: Lease<dyn Renderer>,
    drivers: Vec<Driver>,
    artboard: Lease<dyn Artboard>,
    file: Lease<dyn File>,

    id: SessionId,
    surface: Surface,
    fit: Fit,
    alignment: Alignment,
    autoplay: bool,
    frames_rendered: u64,
    elapsed_total: f64,
    last_elapsed: f64,
}

impl ReadySession {
    /// Advance drivers, then the artboard, then draw one frame.
    pub fn advance_and_draw(&mut self, elapsed_seconds: f64) {
        for driver in self.drivers.iter_mut() {
            driver.advance(&mut *self.artboard, elapsed_seconds);
        }
        self.artboard.advance(elapsed_seconds);

        {
            let mut frame = SavedFrame::enter(&mut *self.renderer);
            frame.renderer.align(
                self.fit,
                self.alignment,
                self.surface.bounds(),
                self.artboard.bounds(),
            );
            self.artboard.draw(&mut *frame.renderer);
        }
        self.renderer.flush();

        self.frames_rendered += 1;
        self.elapsed_total += elapsed_seconds;
        self.last_elapsed = elapsed_seconds;
        trace!(
            "session {} frame {} (+{elapsed_seconds:.4}s)",
            self.id,
            self.frames_rendered
        );
    }

    /// Release renderer, drivers, artboard and file, in that order.
    pub fn dispose(self) {
        debug!("disposing session {}", self.id);
        drop(self);
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn artboard(&self) -> &dyn Artboard {
        &*self.artboard
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    /// Frames drawn so far, including the initial zero-time frame.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn elapsed_total(&self) -> f64 {
        self.elapsed_total
    }

    pub fn last_elapsed(&self) -> f64 {
        self.last_elapsed
    }

    pub fn set_fit(&mut self, fit: Fit) {
        self.fit = fit;
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    /// Track a resize of the bound surface; applies from the next frame.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.surface.width = width;
        self.surface.height = height;
    }

    /// Transform the next frame will use to place the artboard.
    pub fn alignment_transform(&self) -> Mat2D {
        compute_alignment(
            self.fit,
            self.alignment,
            self.surface.bounds(),
            self.artboard.bounds(),
        )
    }
}

impl std::fmt::Debug for ReadySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadySession")
            .field("id", &self.id)
            .field("surface", &self.surface)
            .field("artboard", &self.artboard.name())
            .field("drivers", &self.drivers)
            .field("frames_rendered", &self.frames_rendered)
            .finish()
    }
}
