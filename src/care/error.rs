//! Error types for care-report reconciliation.

use crate::store::{PatchOperation, StoreError};
use thiserror::Error;

/// A patch sequence that was abandoned after too many consecutive failures.
///
/// `applied` batches stay applied; `unapplied` were never confirmed and must be
/// treated as not written. Together they account for every queued operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchAborted {
    pub applied: Vec<PatchOperation>,
    pub unapplied: Vec<PatchOperation>,
    /// Zero-based index of the batch that exhausted its retries.
    pub batch_index: usize,
    pub attempts: u32,
    pub last_error: StoreError,
}

/// Errors that end a reconciliation call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// Nothing to reconcile; rejected before touching the store.
    #[error("no care-provided reports supplied")]
    EmptyInput,

    /// Looking up candidate records failed.
    #[error("record lookup failed: {0}")]
    Store(#[from] StoreError),

    /// Patch batch failed too many times in a row; an undetermined prefix was applied.
    #[error(
        "record store unavailable after {} attempts on batch {}; {} records applied, {} not applied",
        .0.attempts, .0.batch_index, .0.applied.len(), .0.unapplied.len()
    )]
    RetryExhausted(PatchAborted),
}
