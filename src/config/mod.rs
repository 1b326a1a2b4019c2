//! Configuration module for the care-request shim
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`CARE_SHIM_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use care_shim::config::ShimConfig;
//!
//! let config = ShimConfig::default();
//! assert_eq!(config.server.port, 8000);
//!
//! let toml = r#"
//! [store]
//! base_id = "app123"
//! batch_size = 5
//! "#;
//! let config: ShimConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.store.batch_size, 5);
//! assert_eq!(config.store.page_size, 100);
//! ```

pub mod auth;
pub mod error;
pub mod feed;
pub mod logging;
pub mod server;
pub mod store;

pub use auth::AuthConfig;
pub use error::ConfigError;
pub use feed::ProviderFeedConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use server::ServerConfig;
pub use store::{StoreConfig, MAX_BATCH_SIZE, MAX_PAGE_SIZE, MIN_REQUEST_DELAY_MS};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the shim.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShimConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Record store connection and pacing
    pub store: StoreConfig,
    /// Trusted API keys
    pub auth: AuthConfig,
    /// Care-provider feed polled by `sync`
    pub provider_feed: ProviderFeedConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ShimConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("CARE_SHIM_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("CARE_SHIM_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("CARE_SHIM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CARE_SHIM_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(key) = std::env::var("CARE_SHIM_STORE_API_KEY") {
            self.store.api_key = key;
        }
        if let Ok(base_id) = std::env::var("CARE_SHIM_STORE_BASE_ID") {
            self.store.base_id = base_id;
        }

        if let Ok(key) = std::env::var("CARE_SHIM_API_KEY") {
            if !key.is_empty() && !self.auth.api_keys.contains(&key) {
                self.auth.api_keys.push(key);
            }
        }
        if let Ok(token) = std::env::var("CARE_SHIM_FEED_TOKEN") {
            if !token.is_empty() {
                self.provider_feed.token = Some(token);
            }
        }

        self
    }

    /// Validate the record store section.
    pub fn validate_store(&self) -> Result<(), ConfigError> {
        let store = &self.store;
        if store.base_id.is_empty() {
            return Err(ConfigError::MissingStoreSetting("base_id"));
        }
        if store.api_key.is_empty() {
            return Err(ConfigError::MissingStoreSetting("api_key"));
        }
        if !(1..=MAX_BATCH_SIZE).contains(&store.batch_size) {
            return Err(ConfigError::BatchSize(store.batch_size));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&store.page_size) {
            return Err(ConfigError::PageSize(store.page_size));
        }
        if store.request_delay_ms < MIN_REQUEST_DELAY_MS {
            return Err(ConfigError::PacingTooShort {
                configured_ms: store.request_delay_ms,
            });
        }
        if chrono::FixedOffset::east_opt(store.utc_offset_hours * 3600).is_none() {
            return Err(ConfigError::UtcOffset(store.utc_offset_hours));
        }
        Ok(())
    }

    /// Validate everything `serve` needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ZeroPort);
        }

        self.validate_store()?;

        if self.auth.api_keys.iter().all(|k| k.is_empty()) {
            return Err(ConfigError::NoTrustedKeys);
        }

        Ok(())
    }
}
