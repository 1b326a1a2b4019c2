//! Listener settings for `care-shim serve`

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a whole request, including multi-page fetches and
    /// multi-batch patch sequences. Patching waits between batches, so a
    /// large report batch needs several seconds per ten reports.
    pub request_timeout_seconds: u64,
    /// Largest accepted request body. Report batches are small JSON arrays.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_seconds: 300,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port`, resolved by the listener so hostnames work too.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
