//! Shared test utilities for care-shim integration tests.
//!
//! Provides a record-store configuration pointed at a wiremock server and
//! builders for store rows and list pages.

#![allow(dead_code)]

use care_shim::api::{create_router, AppState};
use care_shim::config::{ShimConfig, StoreConfig};
use care_shim::store::RecordStore;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

// =============================================================================
// Well-Known Test Constants
// =============================================================================

pub const BASE_ID: &str = "appTest";
pub const TABLE: &str = "care_requests";
/// Path of the table under the mock server.
pub const TABLE_PATH: &str = "/appTest/care_requests";
pub const STORE_API_KEY: &str = "store-secret";
pub const TRUSTED_KEY: &str = "trusted-key";

// =============================================================================
// Configuration Builders
// =============================================================================

/// Store configuration aimed at `server`, with no pacing delay.
pub fn store_config(server: &MockServer) -> StoreConfig {
    StoreConfig {
        base_url: server.uri(),
        base_id: BASE_ID.to_string(),
        table_name: TABLE.to_string(),
        api_key: STORE_API_KEY.to_string(),
        request_delay_ms: 0,
        timeout_seconds: 5,
        ..Default::default()
    }
}

pub fn shim_config(server: &MockServer) -> ShimConfig {
    let mut config = ShimConfig::default();
    config.store = store_config(server);
    config.auth.api_keys = vec![TRUSTED_KEY.to_string()];
    config
}

pub fn store(server: &MockServer) -> RecordStore {
    RecordStore::new(&store_config(server)).unwrap()
}

/// Router over a store backed by `server`.
pub fn create_test_app(server: &MockServer) -> axum::Router {
    let state = AppState::new(Arc::new(shim_config(server))).unwrap();
    create_router(Arc::new(state))
}

// =============================================================================
// Record Builders
// =============================================================================

/// Minimal open row as returned by the reconciler's lookup.
pub fn open_record(id: &str, hyphenated_citizen_id: &str) -> Value {
    json!({
        "id": id,
        "createdTime": "2021-07-10T02:30:00.000Z",
        "fields": {
            "Citizen ID": hyphenated_citizen_id,
            "Care Status": "SEEKING"
        }
    })
}

/// Row carrying every field the care-request decoder requires.
pub fn full_record(id: &str, hyphenated_citizen_id: &str) -> Value {
    json!({
        "id": id,
        "fields": {
            "Citizen ID": hyphenated_citizen_id,
            "First Name": "Somchai",
            "Last Name": "Jaidee",
            "Phone Number": "081-234-5678",
            "Sex": "MALE",
            "Date of Birth": "1980-01-31",
            "Status": "FINISHED",
            "Street Address": "99 Rama IV",
            "Subdistrict": "Lumphini",
            "District": "Pathum Wan",
            "Province": "Bangkok",
            "Postal Code": "10330",
            "Request Datetime": "2021-07-10T02:30:00.000Z",
            "Covid Test Location Type": "BMA_HOSPITAL",
            "Covid Test Location Name": "Taksin",
            "Covid Test Date": "2021-07-08",
            "Symptoms": ["FEVER"],
            "Care Status": "SEEKING",
            "Location Latitude": 13.73,
            "Location Longitude": 100.54,
            "Caretaker First Name": "Somsri",
            "Caretaker Last Name": "Jaidee",
            "Caretaker Phone Number": "0812345679",
            "Caretaker Relationship": "Spouse"
        }
    })
}

/// One list-response page.
pub fn page(records: Vec<Value>, offset: Option<&str>) -> Value {
    match offset {
        Some(cursor) => json!({ "records": records, "offset": cursor }),
        None => json!({ "records": records }),
    }
}
