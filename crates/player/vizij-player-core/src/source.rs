//! Byte retrieval for remote sources.

use async_trait::async_trait;

use crate::error::Result;

/// Host-provided byte retrieval primitive.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the bytes behind `locator`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PlayerError::Load`] when the bytes cannot be retrieved.
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use log::debug;

    use super::Fetcher;
    use crate::config::PlayerConfig;
    use crate::error::{PlayerError, Result};

    /// [`Fetcher`] over HTTP(S).
    #[derive(Clone, Debug)]
    pub struct HttpFetcher {
        http: reqwest::Client,
    }

    impl HttpFetcher {
        pub fn new(timeout: Option<Duration>) -> Result<Self> {
            let mut builder = reqwest::Client::builder();
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            let http = builder
                .build()
                .map_err(|e| PlayerError::Configuration(format!("http client: {e}")))?;
            Ok(Self { http })
        }

        /// Client using the configured fetch timeout.
        pub fn from_config(config: &PlayerConfig) -> Result<Self> {
            Self::new(config.fetch_timeout())
        }
    }

    #[async_trait]
    impl Fetcher for HttpFetcher {
        async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
            let load_error = |e: reqwest::Error| PlayerError::Load {
                locator: locator.to_string(),
                reason: e.to_string(),
            };
            debug!("fetching {locator}");
            let response = self
                .http
                .get(locator)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(load_error)?;
            let bytes = response.bytes().await.map_err(load_error)?;
            Ok(bytes.to_vec())
        }
    }
}
