//! Reasons a shim configuration cannot be loaded or used

use super::store::{MAX_BATCH_SIZE, MAX_PAGE_SIZE, MIN_REQUEST_DELAY_MS};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("config file is not valid TOML: {0}")]
    Parse(String),

    /// A record store connection setting is empty.
    #[error("store.{0} is required to reach the record store")]
    MissingStoreSetting(&'static str),

    #[error(
        "store.request_delay_ms is {configured_ms}ms; the record store needs at least {}ms between requests",
        MIN_REQUEST_DELAY_MS
    )]
    PacingTooShort { configured_ms: u64 },

    #[error("store.batch_size is {0}; one patch call carries between 1 and {} records", MAX_BATCH_SIZE)]
    BatchSize(usize),

    #[error("store.page_size is {0}; one page holds between 1 and {} records", MAX_PAGE_SIZE)]
    PageSize(usize),

    #[error("store.utc_offset_hours is {0}; must be between -23 and 23")]
    UtcOffset(i32),

    #[error("auth.api_keys has no usable key; every protected request would be rejected")]
    NoTrustedKeys,

    #[error("server.port must be non-zero")]
    ZeroPort,

    #[error("logging.format '{0}' is neither 'pretty' nor 'json'")]
    LogFormat(String),
}
