//! `[logging]` section: verbosity and output format of the shim's tracing

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Target prefix shared by every span and event this crate emits.
const CRATE_TARGET: &str = "care_shim";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per line, for the log shipper
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::LogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Per-module levels under this crate, e.g. `store = "debug"` turns on
    /// every page and patch request the store client sends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<BTreeMap<String, String>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: None,
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directives: the base level, then one `care_shim::<module>=<level>`
    /// per component, in module-name order.
    pub fn filter_directives(&self) -> String {
        let components = self.component_levels.iter().flatten();
        std::iter::once(self.level.clone())
            .chain(components.map(|(module, level)| format!("{}::{}={}", CRATE_TARGET, module, level)))
            .collect::<Vec<_>>()
            .join(",")
    }
}
