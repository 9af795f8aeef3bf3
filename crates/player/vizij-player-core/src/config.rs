//! Runtime configuration for vizij-player-core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlayerError, Result};
use crate::layout::{Alignment, Fit};

/// Host-level player configuration.
/// Every field has a default so partial JSON documents are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Upper bound on module initialization; `None` waits forever.
    pub load_timeout_ms: Option<u64>,
    /// Request timeout for remote sources.
    pub fetch_timeout_ms: Option<u64>,
    /// Refresh rate used by [`crate::frame_loop::IntervalClock`].
    pub frame_rate_hz: f64,
    /// Ask the engine for an offscreen renderer when it supports one.
    pub prefer_offscreen: bool,
    /// Session defaults.
    pub fit: Fit,
    pub alignment: Alignment,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: None,
            fetch_timeout_ms: Some(30_000),
            frame_rate_hz: 60.0,
            prefer_offscreen: false,
            fit: Fit::Contain,
            alignment: Alignment::Center,
        }
    }
}

impl PlayerConfig {
    /// Parse a (possibly partial) JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: PlayerConfig = serde_json::from_str(text)
            .map_err(|e| PlayerError::Configuration(format!("player config: {e}")))?;
        if !(cfg.frame_rate_hz.is_finite() && cfg.frame_rate_hz > 0.0) {
            return Err(PlayerError::Configuration(format!(
                "frame_rate_hz must be positive, got {}",
                cfg.frame_rate_hz
            )));
        }
        Ok(cfg)
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = PlayerConfig::from_json(r#"{ "load_timeout_ms": 250, "fit": "cover" }"#).unwrap();
        assert_eq!(cfg.load_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.fit, Fit::Cover);
        assert_eq!(cfg.alignment, Alignment::Center);
        assert_eq!(cfg.frame_rate_hz, 60.0);
    }

    #[test]
    fn rejects_non_positive_frame_rate() {
        let err = PlayerConfig::from_json(r#"{ "frame_rate_hz": 0 }"#).unwrap_err();
        assert!(matches!(err, PlayerError::Configuration(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            PlayerConfig::from_json("{ nope"),
            Err(PlayerError::Configuration(_))
        ));
    }
}
