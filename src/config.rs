use serde::Deserialize;
use url::Url;

use crate::ConfigError;

const DEFAULT_API_BASE: &str = "https://api.twitter.com";
const DEFAULT_WORKER_THREADS: usize = 4;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client settings. Every field has a default, so a partial document
/// deserializes fine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host every [`Endpoint`](crate::Endpoint) is resolved against.
    pub api_base: String,
    /// Upper bound on threads running asynchronous calls.
    pub worker_threads: usize,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            worker_threads: DEFAULT_WORKER_THREADS,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn api_base<T: Into<String>>(self, api_base: T) -> Self {
        ClientConfig {
            api_base: api_base.into(),
            ..self
        }
    }

    pub fn worker_threads(self, worker_threads: usize) -> Self {
        ClientConfig {
            worker_threads,
            ..self
        }
    }

    pub fn timeout_secs(self, timeout_secs: Option<u64>) -> Self {
        ClientConfig {
            timeout_secs,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.api_base) {
            Ok(url) if !url.cannot_be_a_base() => {}
            _ => return Err(ConfigError::InvalidBaseUrl(self.api_base.clone())),
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}
