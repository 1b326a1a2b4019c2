//! API-key authentication configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trusted API keys, constructed once at startup and handed to the router.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub api_keys: Vec<String>,
}

impl AuthConfig {
    pub fn is_trusted(&self, candidate: &str) -> bool {
        !candidate.is_empty() && self.api_keys.iter().any(|key| key == candidate)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &format!("[{} keys]", self.api_keys.len()))
            .finish()
    }
}
