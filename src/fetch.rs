//! Document retrieval

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Anything that can turn a URL into a response body.
pub trait DocumentFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("feed_bridge/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

/// Blocking HTTP fetcher using ureq
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
                .user_agent(config.user_agent.as_str())
                .build(),
        );
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

impl DocumentFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, "fetching document");

        let resp = self
            .agent
            .get(url)
            .call()
            .map_err(|e| BridgeError::fetch(url, e))?;

        if !resp.status().is_success() {
            return Err(BridgeError::fetch(url, format!("HTTP {}", resp.status())));
        }

        resp.into_body()
            .read_to_string()
            .map_err(|e| BridgeError::fetch(url, e))
    }
}

impl<F: DocumentFetcher + ?Sized> DocumentFetcher for &F {
    fn fetch(&self, url: &str) -> Result<String> {
        (**self).fetch(url)
    }
}

impl<F: DocumentFetcher + ?Sized> DocumentFetcher for Box<F> {
    fn fetch(&self, url: &str) -> Result<String> {
        (**self).fetch(url)
    }
}
