//! care-shim - COVID-19 care-request API over a hosted record store
//!
//! Exposes care requests kept in a hosted spreadsheet-style record store
//! through a small authenticated REST API, and reconciles "care provided"
//! reports from partners (or the provider feed) back into those records.

pub mod api;
pub mod care;
pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod store;
pub mod sync;
