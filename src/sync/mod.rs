//! Provider-feed sync (`care-shim sync`).
//!
//! Polls the care-provider feed once, turns rows whose transfer completed
//! into [`CareProvidedReport`]s and reconciles them directly against the
//! record store, without going through the HTTP API.

use crate::care::{CareProvidedReport, CareReportReconciler, CitizenId, ReconcileError};
use crate::config::{ConfigError, ProviderFeedConfig, ShimConfig};
use crate::store::{RecordStore, StoreError};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Transfer status marking a completed hand-over to a care provider.
pub const TRANSFERRED: &str = "1";

/// One row of the provider feed. Every field is optional so that a single
/// malformed row is rejected on its own instead of failing the whole feed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedRow {
    #[serde(default)]
    pub citizen_id: Option<Value>,
    #[serde(default)]
    pub hos_name: Option<Value>,
    #[serde(default)]
    pub transfer_status: Option<Value>,
}

impl FeedRow {
    fn is_transferred(&self) -> bool {
        match &self.transfer_status {
            Some(Value::String(s)) => s.trim() == TRANSFERRED,
            Some(Value::Number(n)) => n.as_u64() == Some(1),
            _ => false,
        }
    }

    /// Convert to a report, or explain why the row is unusable.
    pub fn to_report(&self) -> Result<CareProvidedReport, String> {
        let citizen_id = match &self.citizen_id {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err("citizen_id is missing".to_string()),
        };
        let citizen_id = CitizenId::parse(&citizen_id).map_err(|e| e.to_string())?;

        let care_provider_name = match &self.hos_name {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err("hos_name is missing".to_string()),
        };

        Ok(CareProvidedReport {
            citizen_id,
            care_provider_name,
        })
    }
}

/// Errors that stop a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("provider feed token is not configured (set CARE_SHIM_FEED_TOKEN)")]
    MissingToken,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("provider feed request failed: {0}")]
    Feed(String),

    #[error("provider feed returned {status}: {message}")]
    FeedStatus { status: u16, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Counts reported at the end of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub feed_rows: usize,
    /// Rows not yet transferred or failing validation.
    pub rejected_rows: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Split feed rows into usable reports and a count of rejected rows.
pub fn rows_to_reports(rows: &[FeedRow]) -> (Vec<CareProvidedReport>, usize) {
    let mut reports = Vec::with_capacity(rows.len());
    let mut rejected = 0usize;

    for row in rows {
        if !row.is_transferred() {
            rejected += 1;
            continue;
        }
        match row.to_report() {
            Ok(report) => reports.push(report),
            Err(reason) => {
                rejected += 1;
                error!(?row, %reason, "Feed row dropped due to a validation error");
            }
        }
    }

    if rejected > 0 {
        warn!(rejected, "Feed rows could not be turned into reports");
    }
    (reports, rejected)
}

/// Fetch the full provider feed.
pub async fn fetch_feed(
    client: &reqwest::Client,
    config: &ProviderFeedConfig,
    token: &str,
) -> Result<Vec<FeedRow>, SyncError> {
    let response = client
        .get(&config.url)
        .query(&[("token", token)])
        .send()
        .await
        .map_err(|e| SyncError::Feed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SyncError::FeedStatus {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<Vec<FeedRow>>()
        .await
        .map_err(|e| SyncError::Feed(e.to_string()))
}

/// Run one sync pass: poll the feed and reconcile what it reports.
///
/// The token is checked before any network call. An empty set of usable
/// reports is a successful no-op.
pub async fn run_sync(config: &ShimConfig) -> Result<SyncSummary, SyncError> {
    let token = config
        .provider_feed
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(SyncError::MissingToken)?;
    config.validate_store()?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.provider_feed.timeout_seconds))
        .build()
        .map_err(|e| SyncError::Feed(e.to_string()))?;

    let rows = fetch_feed(&client, &config.provider_feed, token).await?;
    let (reports, rejected_rows) = rows_to_reports(&rows);
    let mut summary = SyncSummary {
        feed_rows: rows.len(),
        rejected_rows,
        ..Default::default()
    };

    if reports.is_empty() {
        info!(feed_rows = rows.len(), "No transferred rows in provider feed");
        return Ok(summary);
    }

    let store = RecordStore::new(&config.store)?;
    let outcome = CareReportReconciler::new(&store, &config.store)
        .reconcile(reports)
        .await?;

    for skipped in &outcome.skipped {
        warn!(
            citizen_id = %skipped.report.citizen_id,
            reason = ?skipped.reason,
            "Feed report skipped"
        );
    }

    summary.updated = outcome.updated.len();
    summary.skipped = outcome.skipped.len();
    info!(
        updated = summary.updated,
        skipped = summary.skipped,
        rejected = summary.rejected_rows,
        "Provider feed sync complete"
    );
    Ok(summary)
}
