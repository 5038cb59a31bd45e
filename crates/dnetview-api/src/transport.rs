// Shared transport configuration for building reqwest::Client instances.

use std::time::Duration;

use crate::error::Error;

const DEFAULT_USER_AGENT: &str = concat!("dnetview/", env!("CARGO_PKG_VERSION"));

/// Transport settings for the JSON-RPC client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on a single request, including connect.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}
