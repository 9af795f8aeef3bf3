//! Error taxonomy shared by the loader, sessions and the runtime.

use thiserror::Error;

/// Errors surfaced by the player.
///
/// The type is `Clone` because a single module failure is delivered to every
/// queued waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// Neither or both of a source locator and a byte buffer were supplied,
    /// or a configuration document could not be parsed.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Fetching the source bytes failed.
    #[error("failed to load '{locator}': {reason}")]
    Load { locator: String, reason: String },
    /// The engine rejected the buffer.
    #[error("bad data")]
    BadData,
    #[error("file has no artboard{}", .0.as_deref().map(|n| format!(" named '{n}'")).unwrap_or_default())]
    MissingArtboard(Option<String>),
    #[error("unknown animation '{0}'")]
    UnknownAnimation(String),
    #[error("unknown state machine '{0}'")]
    UnknownStateMachine(String),
    #[error("renderer error: {0}")]
    Renderer(String),
    /// The engine module failed to initialize.
    #[error("module init failed: {0}")]
    ModuleInit(String),
    #[error("load timed out after {timeout_ms}ms")]
    LoadTimedOut { timeout_ms: u64 },
    /// The waiter was queued when the loader was reset.
    #[error("loader was reset before the module became ready")]
    LoaderReset,
    #[error("a global runtime loader is already installed")]
    GlobalLoaderInstalled,
}

pub type Result<T, E = PlayerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artboard_message_names_the_artboard() {
        assert_eq!(
            PlayerError::MissingArtboard(Some("Intro".into())).to_string(),
            "file has no artboard named 'Intro'"
        );
        assert_eq!(
            PlayerError::MissingArtboard(None).to_string(),
            "file has no artboard"
        );
    }

    #[test]
    fn bad_data_keeps_the_historical_message() {
        assert_eq!(PlayerError::BadData.to_string(), "bad data");
    }
}
