//! Care-request domain: identifiers, typed rows, reconciliation and patching.

pub mod citizen_id;
mod error;
mod patch;
pub mod reconciler;
pub mod request;

pub use citizen_id::{hyphenate, CitizenId, InvalidCitizenId};
pub use error::{PatchAborted, ReconcileError};
pub use patch::BatchPatchExecutor;
pub use reconciler::{
    CareProvidedReport, CareReportReconciler, Reconciliation, SkipReason, SkippedReport,
};
pub use request::{CareRequest, CareStatus, DecodeError, FieldError, RequestStatus};
