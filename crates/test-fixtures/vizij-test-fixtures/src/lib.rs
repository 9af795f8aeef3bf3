use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

pub mod clock;
pub mod engine;
pub mod fetch;
pub mod module;

pub use clock::ManualClock;
pub use engine::{ArtboardSnapshot, FixtureEngine, Pose, Probe};
pub use fetch::StaticFetcher;
pub use module::{FixtureModule, ModuleGate};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    scenes: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Scene documents understood by [`FixtureEngine`].
pub mod scenes {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.scenes.keys().cloned().collect()
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.scenes, "scene", name)?;
        Ok(resolve_path(rel))
    }

    /// Raw file bytes, as a host would hand them to the engine.
    pub fn bytes(name: &str) -> Result<Vec<u8>> {
        let path = path(name)?;
        fs::read(&path).with_context(|| format!("failed to read fixture at {}", path.display()))
    }
}
