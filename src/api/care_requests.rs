//! Care-request listing endpoint handler.

use crate::api::{ApiError, AppState, CareRequestListResponse, ListParams};
use crate::care::request::columns;
use crate::care::CareRequest;
use crate::store::formula::{self, Combinator, DateTimeUnit, Timestamp};
use crate::store::{Query as StoreQuery, SortDirection};
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::FixedOffset;
use std::sync::Arc;
use tracing::{info, warn};

/// GET /care-requests - List care requests, oldest first.
///
/// `since` and `until` bound the request timestamp; values without an
/// offset are read in the configured zone. `skip` and `limit` page over the
/// store rows in that order. Rows that fail validation are dropped and
/// counted rather than failing the listing.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<CareRequestListResponse>, ApiError> {
    let zone = state.config.store.timezone();
    let filter = request_window_filter(&params, zone)?;

    let mut query = StoreQuery::new()
        .filter(filter)
        .sort(columns::REQUEST_DATETIME, SortDirection::Asc)
        .page_size(state.config.store.page_size);
    let skip = params.skip.unwrap_or(0);
    if let Some(limit) = params.limit {
        query = query.max_records(limit.saturating_add(skip));
    }

    let records: Vec<_> = state.store.fetch(query).await?.into_iter().skip(skip).collect();
    let total = records.len();

    let mut data = Vec::with_capacity(total);
    for record in &records {
        match CareRequest::decode(record, zone) {
            Ok(request) => data.push(request),
            Err(e) => {
                warn!(record_id = %e.record_id, error = %e, "Dropped invalid care request");
            }
        }
    }

    let dropped = total - data.len();
    if dropped > 0 {
        metrics::counter!("care_shim_records_dropped_total").increment(dropped as u64);
        warn!(dropped, total, "Care requests dropped due to validation errors");
    }
    info!(returned = data.len(), "Listed care requests");

    Ok(Json(CareRequestListResponse { data, dropped }))
}

fn request_window_filter(params: &ListParams, zone: FixedOffset) -> Result<String, ApiError> {
    let mut terms = Vec::new();

    if let Some(since) = params.since.as_deref() {
        terms.push(formula::is_after(
            columns::REQUEST_DATETIME,
            &bound_expression(since, "since", zone)?,
        ));
    }
    if let Some(until) = params.until.as_deref() {
        terms.push(formula::is_before(
            columns::REQUEST_DATETIME,
            &bound_expression(until, "until", zone)?,
        ));
    }

    Ok(formula::chain(Combinator::And, &terms))
}

/// Parse a window bound and render it; unparseable or unplaceable bounds are a 422.
fn bound_expression(value: &str, param: &str, zone: FixedOffset) -> Result<String, ApiError> {
    let at = value
        .parse::<Timestamp>()
        .map_err(|e| ApiError::unprocessable_param(&e, param))?;
    formula::datetime_expression(at, zone, DateTimeUnit::Milliseconds)
        .map_err(|e| ApiError::unprocessable_param(&e.to_string(), param))
}
