//! Care-provider feed configuration (used by `care-shim sync`)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderFeedConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ProviderFeedConfig {
    fn default() -> Self {
        Self {
            url: "http://cmc.bangkok.go.th/cvformapi/api/nawaminsent".to_string(),
            token: None,
            timeout_seconds: 60,
        }
    }
}
