//! Client for the hosted record store holding care-request rows.
//!
//! Only the two request shapes this service needs are supported: a paginated
//! list (`GET` with `filterByFormula`, `fields[]`, `sort`, `offset`) and a
//! batched partial update (`PATCH` with at most ten records).

mod error;
pub mod formula;
mod types;

pub use error::StoreError;
pub use types::{PatchOperation, Query, Record, RecordPage, SortDirection};

use crate::config::StoreConfig;
use std::time::Duration;
use tracing::{debug, warn};
use types::PatchRequest;

/// HTTP collaborator for one table of the record store.
#[derive(Clone)]
pub struct RecordStore {
    client: reqwest::Client,
    table_url: String,
    api_key: String,
    request_delay: Duration,
    timeout_secs: u64,
}

impl RecordStore {
    /// Create a store client with its own connection pool.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;
        Ok(Self::with_client(config, client))
    }

    /// Create a store client around an existing HTTP client (for testing).
    pub fn with_client(config: &StoreConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            table_url: config.table_url(),
            api_key: config.api_key.clone(),
            request_delay: config.request_delay(),
            timeout_secs: config.timeout_seconds,
        }
    }

    /// Pause observed between consecutive requests to the store.
    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    /// Fetch every record matching `query`, following continuation cursors.
    ///
    /// The first request carries the full query; each follow-up carries only
    /// the `offset` cursor from the previous page and is preceded by the
    /// configured delay. Any failure aborts the whole fetch; records from
    /// earlier pages are discarded.
    pub async fn fetch(&self, query: Query) -> Result<Vec<Record>, StoreError> {
        let params = query.into_params();
        let mut page = self.get_page(&params).await?;
        let mut records = page.records;
        let mut pages = 1usize;

        while let Some(cursor) = page.offset.take().filter(|c| !c.is_empty()) {
            tokio::time::sleep(self.request_delay).await;
            debug!(
                page = pages + 1,
                records_so_far = records.len(),
                "Following record store continuation cursor"
            );
            page = self
                .get_page(&[("offset".to_string(), cursor)])
                .await?;
            records.append(&mut page.records);
            pages += 1;
        }

        debug!(pages, records = records.len(), "Record store fetch complete");
        Ok(records)
    }

    async fn get_page(&self, params: &[(String, String)]) -> Result<RecordPage, StoreError> {
        metrics::counter!("care_shim_store_requests_total", "method" => "GET").increment(1);

        let response = self
            .client
            .get(&self.table_url)
            .bearer_auth(&self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Record store rejected list request");
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<RecordPage>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    /// Send one PATCH carrying `operations`. No retry happens here.
    pub async fn patch(&self, operations: &[PatchOperation]) -> Result<(), StoreError> {
        metrics::counter!("care_shim_store_requests_total", "method" => "PATCH").increment(1);

        let response = self
            .client
            .patch(&self.table_url)
            .bearer_auth(&self.api_key)
            .json(&PatchRequest {
                records: operations,
            })
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(StoreError::Upstream {
                status: status.as_u16(),
                message,
            })
        }
    }
}
