//! Record store configuration

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Shortest pause the record store tolerates between consecutive requests.
pub const MIN_REQUEST_DELAY_MS: u64 = 500;

/// Largest number of records one PATCH call may carry.
pub const MAX_BATCH_SIZE: usize = 10;

/// Largest page the store serves, also the practical ceiling on OR-terms per filter.
pub const MAX_PAGE_SIZE: usize = 100;

/// Connection and pacing settings for the hosted record store.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: String,
    pub base_id: String,
    pub table_name: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Zone attached to timestamps that carry none, in whole hours east of UTC.
    pub utc_offset_hours: i32,
    pub request_delay_ms: u64,
    pub page_size: usize,
    pub batch_size: usize,
    /// Consecutive failed attempts tolerated for one patch batch before aborting.
    pub max_retries: u32,
    /// Care requests older than this are never updated.
    pub max_age_days: u32,
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.airtable.com/v0".to_string(),
            base_id: String::new(),
            table_name: "Care Requests".to_string(),
            api_key: String::new(),
            utc_offset_hours: 7,
            request_delay_ms: MIN_REQUEST_DELAY_MS,
            page_size: MAX_PAGE_SIZE,
            batch_size: MAX_BATCH_SIZE,
            max_retries: 5,
            max_age_days: 21,
            timeout_seconds: 30,
        }
    }
}

impl StoreConfig {
    /// Full URL of the configured table. Table names usually contain spaces.
    pub fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.base_id),
            urlencoding::encode(&self.table_name)
        )
    }

    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("base_id", &self.base_id)
            .field("table_name", &self.table_name)
            .field("api_key", &"[REDACTED]")
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("request_delay_ms", &self.request_delay_ms)
            .field("page_size", &self.page_size)
            .field("batch_size", &self.batch_size)
            .field("max_retries", &self.max_retries)
            .field("max_age_days", &self.max_age_days)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}
