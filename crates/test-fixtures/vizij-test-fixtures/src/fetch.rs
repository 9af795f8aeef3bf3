use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use vizij_player_core::{Fetcher, PlayerError};

/// [`Fetcher`] serving bytes from memory. Unknown locators fail like a 404.
#[derive(Default)]
pub struct StaticFetcher {
    files: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(locator.into(), bytes.into());
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, locator: &str) -> vizij_player_core::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(locator)
            .cloned()
            .ok_or_else(|| PlayerError::Load {
                locator: locator.to_string(),
                reason: "404 Not Found".into(),
            })
    }
}
