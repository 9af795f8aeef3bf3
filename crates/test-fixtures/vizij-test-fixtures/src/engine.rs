//! Recording engine.
//!
//! Files are JSON scene documents. Every call made against the engine's
//! objects is appended to a shared [`Probe`], together with allocation and
//! release counts, so tests can assert call order and check for leaks.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use vizij_player_core::{
    Aabb, Alignment, Artboard, Engine, File, Fit, LinearAnimationInstance, NativeObject,
    PlayerError, Renderer, StateMachineInstance, Surface,
};

#[derive(Clone, Debug, Deserialize)]
struct SceneDoc {
    artboards: Vec<ArtboardDoc>,
}

#[derive(Clone, Debug, Deserialize)]
struct ArtboardDoc {
    name: String,
    bounds: Aabb,
    #[serde(default)]
    animations: Vec<String>,
    #[serde(default)]
    state_machines: Vec<String>,
}

/// Pose applied by the most recent linear animation.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    pub animation: String,
    pub time: f64,
    pub mix: f32,
}

/// Observable state of one artboard instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArtboardSnapshot {
    pub name: String,
    pub advances: u32,
    pub draws: u32,
    /// Sum of every advance.
    pub time: f64,
    /// Driver input consumed by artboard advances so far.
    pub driven_time: f64,
    /// Driver input consumed by the latest advance.
    pub last_driven: f64,
    pub pose: Option<Pose>,
}

impl ArtboardSnapshot {
    /// The parts of the snapshot that determine what is on screen.
    pub fn scene(&self) -> (f64, f64, Option<Pose>) {
        (self.time, self.driven_time, self.pose.clone())
    }
}

#[derive(Debug, Default)]
struct ArtboardState {
    snapshot: ArtboardSnapshot,
    pending_input: f64,
}

type SharedArtboard = Arc<Mutex<ArtboardState>>;

#[derive(Default)]
struct Ledger {
    calls: Vec<String>,
    released: Vec<&'static str>,
    acquired: u64,
    live: HashSet<u64>,
    artboards: Vec<SharedArtboard>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Shared record of engine activity.
#[derive(Clone, Default)]
pub struct Probe {
    ledger: Arc<Mutex<Ledger>>,
}

impl Probe {
    pub fn calls(&self) -> Vec<String> {
        lock(&self.ledger).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.ledger).calls.clear();
    }

    /// Count calls ending with `suffix` (e.g. ".draw").
    pub fn count(&self, suffix: &str) -> usize {
        lock(&self.ledger)
            .calls
            .iter()
            .filter(|c| c.ends_with(suffix))
            .count()
    }

    /// Kinds of released objects, in release order.
    pub fn released(&self) -> Vec<&'static str> {
        lock(&self.ledger).released.clone()
    }

    pub fn acquired(&self) -> usize {
        lock(&self.ledger).acquired as usize
    }

    /// Objects allocated and not yet released.
    pub fn live_objects(&self) -> usize {
        lock(&self.ledger).live.len()
    }

    /// Every artboard instance created so far, in creation order.
    pub fn artboards(&self) -> Vec<ArtboardSnapshot> {
        let shared = lock(&self.ledger).artboards.clone();
        shared
            .iter()
            .map(|state| lock(state).snapshot.clone())
            .collect()
    }

    /// Latest instance of the artboard called `name`.
    pub fn artboard(&self, name: &str) -> Option<ArtboardSnapshot> {
        self.artboards().into_iter().rev().find(|a| a.name == name)
    }

    fn record(&self, call: String) {
        lock(&self.ledger).calls.push(call);
    }

    /// Register a new object and return its id.
    fn acquire(&self) -> u64 {
        let mut ledger = lock(&self.ledger);
        ledger.acquired += 1;
        let id = ledger.acquired;
        ledger.live.insert(id);
        id
    }

    /// Panics when `id` is not live, so a second release of one object fails
    /// the test that caused it.
    fn release(&self, kind: &'static str, id: u64) {
        let mut ledger = lock(&self.ledger);
        assert!(ledger.live.remove(&id), "{kind} #{id} released twice");
        ledger.released.push(kind);
    }

    fn track_artboard(&self, state: SharedArtboard) {
        lock(&self.ledger).artboards.push(state);
    }
}

/// In-process [`Engine`] over JSON scene documents.
#[derive(Clone, Default)]
pub struct FixtureEngine {
    probe: Probe,
    state_machine_gain: Option<f64>,
    renderer_error: Option<String>,
}

impl FixtureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale the input state machines feed to their artboard (default 1.0).
    pub fn with_state_machine_gain(mut self, gain: f64) -> Self {
        self.state_machine_gain = Some(gain);
        self
    }

    /// Make every renderer construction fail.
    pub fn with_failing_renderer(mut self, reason: impl Into<String>) -> Self {
        self.renderer_error = Some(reason.into());
        self
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl Engine for FixtureEngine {
    fn load(&self, bytes: &[u8]) -> Option<Box<dyn File>> {
        self.probe.record("engine.load".into());
        let doc: SceneDoc = serde_json::from_slice(bytes).ok()?;
        Some(Box::new(FixtureFile {
            id: self.probe.acquire(),
            doc,
            probe: self.probe.clone(),
            gain: self.state_machine_gain.unwrap_or(1.0),
        }))
    }

    fn make_renderer(
        &self,
        surface: &Surface,
        _prefer_offscreen: bool,
    ) -> vizij_player_core::Result<Box<dyn Renderer>> {
        if let Some(reason) = &self.renderer_error {
            return Err(PlayerError::Renderer(reason.clone()));
        }
        Ok(Box::new(FixtureRenderer {
            id: self.probe.acquire(),
            surface: surface.id.clone(),
            probe: self.probe.clone(),
            depth: 0,
        }))
    }
}

struct FixtureFile {
    id: u64,
    doc: SceneDoc,
    probe: Probe,
    gain: f64,
}

impl FixtureFile {
    fn instance(&self, doc: &ArtboardDoc) -> Box<dyn Artboard> {
        let state = Arc::new(Mutex::new(ArtboardState {
            snapshot: ArtboardSnapshot {
                name: doc.name.clone(),
                ..ArtboardSnapshot::default()
            },
            pending_input: 0.0,
        }));
        self.probe.track_artboard(Arc::clone(&state));
        Box::new(FixtureArtboard {
            id: self.probe.acquire(),
            doc: doc.clone(),
            state,
            probe: self.probe.clone(),
            gain: self.gain,
        })
    }
}

impl NativeObject for FixtureFile {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn release(self: Box<Self>) {
        self.probe.release("file", self.id);
    }
}

impl File for FixtureFile {
    fn default_artboard(&self) -> Option<Box<dyn Artboard>> {
        self.doc.artboards.first().map(|doc| self.instance(doc))
    }

    fn artboard_by_name(&self, name: &str) -> Option<Box<dyn Artboard>> {
        self.doc
            .artboards
            .iter()
            .find(|a| a.name == name)
            .map(|doc| self.instance(doc))
    }
}

struct FixtureArtboard {
    id: u64,
    doc: ArtboardDoc,
    state: SharedArtboard,
    probe: Probe,
    gain: f64,
}

impl FixtureArtboard {
    fn state_machine(&self, name: &str) -> Box<dyn StateMachineInstance> {
        Box::new(FixtureStateMachine {
            id: self.probe.acquire(),
            name: name.to_string(),
            artboard: Arc::clone(&self.state),
            probe: self.probe.clone(),
            gain: self.gain,
        })
    }
}

impl NativeObject for FixtureArtboard {
    fn kind(&self) -> &'static str {
        "artboard"
    }

    fn release(self: Box<Self>) {
        self.probe.release("artboard", self.id);
    }
}

impl Artboard for FixtureArtboard {
    fn name(&self) -> &str {
        &self.doc.name
    }

    fn bounds(&self) -> Aabb {
        self.doc.bounds
    }

    fn advance(&mut self, seconds: f64) {
        let consumed = {
            let mut state = lock(&self.state);
            let consumed = std::mem::take(&mut state.pending_input);
            let snapshot = &mut state.snapshot;
            snapshot.advances += 1;
            snapshot.time += seconds;
            snapshot.driven_time += consumed;
            snapshot.last_driven = consumed;
            consumed
        };
        self.probe
            .record(format!("artboard[{}].advance driven={consumed:.4}", self.doc.name));
    }

    fn draw(&self, _renderer: &mut dyn Renderer) {
        lock(&self.state).snapshot.draws += 1;
        self.probe.record(format!("artboard[{}].draw", self.doc.name));
    }

    fn animation_by_name(&self, name: &str) -> Option<Box<dyn LinearAnimationInstance>> {
        if !self.doc.animations.iter().any(|a| a == name) {
            return None;
        }
        Some(Box::new(FixtureAnimation {
            id: self.probe.acquire(),
            name: name.to_string(),
            time: 0.0,
            artboard: Arc::clone(&self.state),
            probe: self.probe.clone(),
        }))
    }

    fn state_machine_by_index(&self, index: usize) -> Option<Box<dyn StateMachineInstance>> {
        let name = self.doc.state_machines.get(index)?;
        Some(self.state_machine(name))
    }

    fn state_machine_by_name(&self, name: &str) -> Option<Box<dyn StateMachineInstance>> {
        let name = self.doc.state_machines.iter().find(|s| *s == name)?;
        Some(self.state_machine(name))
    }
}

struct FixtureStateMachine {
    id: u64,
    name: String,
    artboard: SharedArtboard,
    probe: Probe,
    gain: f64,
}

impl NativeObject for FixtureStateMachine {
    fn kind(&self) -> &'static str {
        "state_machine"
    }

    fn release(self: Box<Self>) {
        self.probe.release("state_machine", self.id);
    }
}

impl StateMachineInstance for FixtureStateMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self, _artboard: &mut dyn Artboard, seconds: f64) {
        lock(&self.artboard).pending_input += seconds * self.gain;
        self.probe
            .record(format!("state_machine[{}].advance", self.name));
    }
}

struct FixtureAnimation {
    id: u64,
    name: String,
    time: f64,
    artboard: SharedArtboard,
    probe: Probe,
}

impl NativeObject for FixtureAnimation {
    fn kind(&self) -> &'static str {
        "linear_animation"
    }

    fn release(self: Box<Self>) {
        self.probe.release("linear_animation", self.id);
    }
}

impl LinearAnimationInstance for FixtureAnimation {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self, seconds: f64) {
        self.time += seconds;
        self.probe.record(format!("animation[{}].advance", self.name));
    }

    fn apply(&mut self, artboard: &mut dyn Artboard, mix: f32) {
        self.probe.record(format!(
            "animation[{}].apply artboard={} mix={mix}",
            self.name,
            artboard.name()
        ));
        // The pose lands on the artboard instance this animation was made from.
        lock(&self.artboard).snapshot.pose = Some(Pose {
            animation: self.name.clone(),
            time: self.time,
            mix,
        });
    }
}

struct FixtureRenderer {
    id: u64,
    surface: String,
    probe: Probe,
    depth: u32,
}

impl NativeObject for FixtureRenderer {
    fn kind(&self) -> &'static str {
        "renderer"
    }

    fn release(self: Box<Self>) {
        self.probe.release("renderer", self.id);
    }
}

impl FixtureRenderer {
    fn record(&self, op: &str) {
        self.probe
            .record(format!("renderer[{}].{op}", self.surface));
    }
}

impl Renderer for FixtureRenderer {
    fn clear(&mut self) {
        self.record("clear");
    }

    fn save(&mut self) {
        self.depth += 1;
        self.record("save");
    }

    fn restore(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.record("restore");
    }

    fn align(&mut self, fit: Fit, alignment: Alignment, frame: Aabb, content: Aabb) {
        self.record(&format!(
            "align {fit:?} {alignment:?} {}x{} <- {}x{}",
            frame.width(),
            frame.height(),
            content.width(),
            content.height()
        ));
    }

    fn flush(&mut self) {
        self.record(&format!("flush depth={}", self.depth));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_are_tracked_per_object() {
        let probe = Probe::default();
        let first = probe.acquire();
        let second = probe.acquire();
        probe.release("file", second);
        assert_eq!(probe.live_objects(), 1);
        probe.release("artboard", first);
        assert_eq!(probe.released(), vec!["file", "artboard"]);
        assert_eq!(probe.live_objects(), 0);
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_fails_loudly() {
        let probe = Probe::default();
        let id = probe.acquire();
        probe.acquire();
        probe.release("renderer", id);
        probe.release("renderer", id);
    }
}
