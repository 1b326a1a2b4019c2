//! Care-provided reconciliation endpoint handler.

use crate::api::{ApiError, AppState, CareProvidedResponse};
use crate::care::{CareProvidedReport, CareReportReconciler};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// POST /care-requests/care-provided - Mark matching care requests as PROVIDED.
///
/// 200 when every report was applied, 207 when any was skipped, 422 for an
/// empty or malformed batch, 502 when the lookup failed and 503 when patching
/// gave up part-way.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<CareProvidedReport>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(reports) = payload?;

    if let Some(index) = reports
        .iter()
        .position(|r| r.care_provider_name.trim().is_empty())
    {
        return Err(ApiError::unprocessable_param(
            "care_provider_name must not be empty",
            &format!("[{}].care_provider_name", index),
        ));
    }

    info!(reports = reports.len(), "Care-provided reconciliation request");

    let start = Instant::now();
    let reconciler = CareReportReconciler::new(&state.store, &state.config.store);
    let result = reconciler.reconcile(reports).await;
    metrics::histogram!("care_shim_reconcile_duration_seconds")
        .record(start.elapsed().as_secs_f64());

    let outcome = result.map_err(|e| {
        warn!(error = %e, "Care-provided reconciliation failed");
        ApiError::from(e)
    })?;

    let status = if outcome.skipped.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok((
        status,
        Json(CareProvidedResponse {
            updated: outcome.updated,
            skipped: outcome.skipped,
        }),
    )
        .into_response())
}
