//! Matching "care provided" reports to open care requests.
//!
//! A report updates a record only when its citizen identifier occurs once in
//! the submitted batch and exactly one open record carries that identifier.
//! Open means contact status `FINISHED`, care not yet `PROVIDED`, and a
//! request no older than the configured age limit. Everything else is
//! reported back as skipped with a reason; nothing is dropped silently.

use super::citizen_id::CitizenId;
use super::error::ReconcileError;
use super::patch::BatchPatchExecutor;
use super::request::{columns, CareStatus, RequestStatus};
use crate::config::StoreConfig;
use crate::store::formula::{self, Combinator, DateTimeUnit};
use crate::store::{PatchOperation, Query, Record, RecordStore, SortDirection};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Inbound report that a citizen has received care.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareProvidedReport {
    pub citizen_id: CitizenId,
    pub care_provider_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The identifier appears more than once in the same batch.
    DuplicateCitizenId,
    NoMatchingRecord,
    MultipleMatchingRecords,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReport {
    #[serde(flatten)]
    pub report: CareProvidedReport,
    pub reason: SkipReason,
}

/// Per-report outcomes plus the patches they produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub updated: Vec<CareProvidedReport>,
    pub skipped: Vec<SkippedReport>,
    pub operations: Vec<PatchOperation>,
}

pub struct CareReportReconciler<'a> {
    store: &'a RecordStore,
    config: &'a StoreConfig,
}

impl<'a> CareReportReconciler<'a> {
    pub fn new(store: &'a RecordStore, config: &'a StoreConfig) -> Self {
        Self { store, config }
    }

    /// Classify `reports` and apply the resulting patches.
    ///
    /// On success `operations` holds every applied patch. A
    /// [`ReconcileError::RetryExhausted`] means some prefix of the patches
    /// was written and the rest was not.
    pub async fn reconcile(
        &self,
        reports: Vec<CareProvidedReport>,
    ) -> Result<Reconciliation, ReconcileError> {
        let now = Utc::now().with_timezone(&self.config.timezone());
        let plan = self.plan(reports, now).await?;

        let applied = BatchPatchExecutor::new(self.store, self.config)
            .apply(plan.operations)
            .await
            .map_err(ReconcileError::RetryExhausted)?;

        metrics::counter!("care_shim_reports_total", "outcome" => "updated")
            .increment(plan.updated.len() as u64);
        metrics::counter!("care_shim_reports_total", "outcome" => "skipped")
            .increment(plan.skipped.len() as u64);
        info!(
            updated = plan.updated.len(),
            skipped = plan.skipped.len(),
            patched_records = applied.len(),
            "Care-provided reports reconciled"
        );

        Ok(Reconciliation {
            updated: plan.updated,
            skipped: plan.skipped,
            operations: applied,
        })
    }

    /// Look up candidates and classify `reports` as of `now`, without writing.
    pub async fn plan(
        &self,
        reports: Vec<CareProvidedReport>,
        now: DateTime<FixedOffset>,
    ) -> Result<Reconciliation, ReconcileError> {
        if reports.is_empty() {
            return Err(ReconcileError::EmptyInput);
        }

        let mut seen = HashSet::new();
        let distinct: Vec<CitizenId> = reports
            .iter()
            .filter(|r| seen.insert(&r.citizen_id))
            .map(|r| r.citizen_id.clone())
            .collect();

        let mut matched_records = Vec::new();
        for page in distinct.chunks(self.config.page_size.max(1)) {
            let query = Query::new()
                .field(columns::CITIZEN_ID)
                .field(columns::CARE_STATUS)
                .field(columns::NOTE)
                .filter(open_requests_filter(page, now, self.config.max_age_days))
                .sort(columns::REQUEST_DATETIME, SortDirection::Asc)
                .page_size(self.config.page_size);
            let mut records = self.store.fetch(query).await?;
            debug!(
                identifiers = page.len(),
                matched = records.len(),
                "Fetched candidate care requests"
            );
            matched_records.append(&mut records);
        }

        Ok(classify(reports, &matched_records, now))
    }
}

/// Filter selecting open care requests for any of `ids`.
pub fn open_requests_filter(
    ids: &[CitizenId],
    now: DateTime<FixedOffset>,
    max_age_days: u32,
) -> String {
    let id_terms: Vec<String> = ids
        .iter()
        .map(|id| formula::equals(columns::CITIZEN_ID, &id.hyphenated()))
        .collect();
    let now_expr = formula::instant_expression(now, DateTimeUnit::Days);

    formula::chain(
        Combinator::And,
        &[
            formula::chain(Combinator::Or, &id_terms),
            format!(
                "{}<={}",
                formula::datetime_diff(&now_expr, columns::REQUEST_DATETIME, DateTimeUnit::Days),
                max_age_days
            ),
            formula::equals(columns::STATUS, RequestStatus::Finished.as_str()),
            formula::not_equals(columns::CARE_STATUS, CareStatus::Provided.as_str()),
        ],
    )
}

/// Decide each report's outcome against the fetched candidates, in input order.
pub fn classify(
    reports: Vec<CareProvidedReport>,
    matched_records: &[Record],
    now: DateTime<FixedOffset>,
) -> Reconciliation {
    let mut occurrences: HashMap<CitizenId, usize> = HashMap::new();
    for report in &reports {
        *occurrences.entry(report.citizen_id.clone()).or_default() += 1;
    }

    let mut by_citizen: HashMap<&str, Vec<&Record>> = HashMap::new();
    for record in matched_records {
        if let Some(id) = record.text(columns::CITIZEN_ID) {
            by_citizen.entry(id).or_default().push(record);
        }
    }

    let mut outcome = Reconciliation::default();
    for report in reports {
        if occurrences.get(&report.citizen_id).copied().unwrap_or(0) != 1 {
            outcome.skipped.push(SkippedReport {
                report,
                reason: SkipReason::DuplicateCitizenId,
            });
            continue;
        }

        let hyphenated = report.citizen_id.hyphenated();
        match by_citizen.get(hyphenated.as_str()).map(Vec::as_slice) {
            Some([record]) => {
                outcome.operations.push(care_provided_patch(record, &report, now));
                outcome.updated.push(report);
            }
            Some(records) if records.len() > 1 => outcome.skipped.push(SkippedReport {
                report,
                reason: SkipReason::MultipleMatchingRecords,
            }),
            _ => outcome.skipped.push(SkippedReport {
                report,
                reason: SkipReason::NoMatchingRecord,
            }),
        }
    }
    outcome
}

/// Patch marking `record` as provided, with an audit line prepended to its note.
pub fn care_provided_patch(
    record: &Record,
    report: &CareProvidedReport,
    now: DateTime<FixedOffset>,
) -> PatchOperation {
    let existing_note = record.text(columns::NOTE).unwrap_or_default();
    let note = format!(
        "Update care status to PROVIDED by {} via API-SHIM on {}\n{}",
        report.care_provider_name,
        now.to_rfc3339_opts(SecondsFormat::Secs, false),
        existing_note
    );

    let mut fields = Map::new();
    fields.insert(
        columns::CARE_STATUS.to_string(),
        Value::from(CareStatus::Provided.as_str()),
    );
    fields.insert(
        columns::CARE_PROVIDER_NAME.to_string(),
        Value::from(report.care_provider_name.clone()),
    );
    fields.insert(columns::NOTE.to_string(), Value::from(note));

    PatchOperation {
        record_id: record.id.clone(),
        field_updates: fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2021-07-20T10:00:00+07:00").unwrap()
    }

    fn report(id: &str, provider: &str) -> CareProvidedReport {
        CareProvidedReport {
            citizen_id: CitizenId::parse(id).unwrap(),
            care_provider_name: provider.to_string(),
        }
    }

    fn record(id: &str, citizen: &str, note: Option<&str>) -> Record {
        let mut fields = json!({"Citizen ID": citizen, "Care Status": "SEEKING"});
        if let Some(note) = note {
            fields["Note"] = json!(note);
        }
        serde_json::from_value(json!({"id": id, "fields": fields})).unwrap()
    }

    #[test]
    fn test_single_match_is_updated() {
        let records = vec![record("rec1", "1-2345-67890-12-3", Some("called twice"))];
        let outcome = classify(vec![report("1234567890123", "Hospital A")], &records, now());

        assert_eq!(outcome.updated.len(), 1);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.operations.len(), 1);

        let op = &outcome.operations[0];
        assert_eq!(op.record_id, "rec1");
        assert_eq!(op.field_updates["Care Status"], json!("PROVIDED"));
        assert_eq!(op.field_updates["Care Provider Name"], json!("Hospital A"));
        assert_eq!(
            op.field_updates["Note"],
            json!("Update care status to PROVIDED by Hospital A via API-SHIM on 2021-07-20T10:00:00+07:00\ncalled twice")
        );
    }

    #[test]
    fn test_missing_note_gets_audit_line_only() {
        let records = vec![record("rec1", "1-2345-67890-12-3", None)];
        let outcome = classify(vec![report("1234567890123", "Clinic")], &records, now());
        let note = outcome.operations[0].field_updates["Note"].as_str().unwrap();
        assert!(note.ends_with("+07:00\n"));
    }

    #[test]
    fn test_no_match_is_skipped() {
        let outcome = classify(vec![report("1234567890123", "Hospital A")], &[], now());
        assert!(outcome.updated.is_empty());
        assert_eq!(outcome.skipped[0].reason, SkipReason::NoMatchingRecord);
        assert!(outcome.operations.is_empty());
    }

    #[test]
    fn test_multiple_matches_are_skipped() {
        let records = vec![
            record("rec1", "1-2345-67890-12-3", None),
            record("rec2", "1-2345-67890-12-3", None),
        ];
        let outcome = classify(vec![report("1234567890123", "Hospital A")], &records, now());
        assert_eq!(outcome.skipped[0].reason, SkipReason::MultipleMatchingRecords);
        assert!(outcome.operations.is_empty());
    }

    #[test]
    fn test_duplicate_identifiers_skip_both_even_with_single_match() {
        let records = vec![record("rec1", "1-2345-67890-12-3", None)];
        let outcome = classify(
            vec![
                report("1234567890123", "Hospital A"),
                report("1234567890123", "Hospital B"),
            ],
            &records,
            now(),
        );
        assert!(outcome.updated.is_empty());
        assert_eq!(outcome.skipped.len(), 2);
        assert!(outcome
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::DuplicateCitizenId));
        assert!(outcome.operations.is_empty());
    }

    #[test]
    fn test_outcomes_follow_input_order() {
        let records = vec![
            record("rec1", "1-1111-11111-11-1", None),
            record("rec3", "3-3333-33333-33-3", None),
        ];
        let outcome = classify(
            vec![
                report("3333333333333", "C"),
                report("2222222222222", "B"),
                report("1111111111111", "A"),
            ],
            &records,
            now(),
        );
        let updated: Vec<&str> = outcome.updated.iter().map(|r| r.citizen_id.as_str()).collect();
        assert_eq!(updated, vec!["3333333333333", "1111111111111"]);
        let patched: Vec<&str> = outcome.operations.iter().map(|o| o.record_id.as_str()).collect();
        assert_eq!(patched, vec!["rec3", "rec1"]);
        assert_eq!(outcome.skipped[0].report.citizen_id.as_str(), "2222222222222");
    }

    #[test]
    fn test_open_requests_filter_shape() {
        let ids = vec![
            CitizenId::parse("1234567890123").unwrap(),
            CitizenId::parse("9876543210987").unwrap(),
        ];
        let filter = open_requests_filter(&ids, now(), 21);
        assert_eq!(
            filter,
            concat!(
                r#"AND(OR({Citizen ID}="1-2345-67890-12-3",{Citizen ID}="9-8765-43210-98-7"),"#,
                r#"AND(DATETIME_DIFF(DATETIME_PARSE("2021 07 20 10 00 00 +0700","YYYY MM DD HH mm ss ZZ","d"),{Request Datetime},"d")<=21,"#,
                r#"AND({Status}="FINISHED",{Care Status}!="PROVIDED")))"#
            )
        );
    }

    #[test]
    fn test_skipped_report_serializes_flat() {
        let skipped = SkippedReport {
            report: report("1234567890123", "Hospital A"),
            reason: SkipReason::DuplicateCitizenId,
        };
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            json!({
                "citizen_id": "1234567890123",
                "care_provider_name": "Hospital A",
                "reason": "duplicate_citizen_id"
            })
        );
    }
}
