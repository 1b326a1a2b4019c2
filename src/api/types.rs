//! Request, response and error types for the public API.

use crate::care::{CareProvidedReport, CareRequest, PatchAborted, ReconcileError, SkippedReport};
use crate::store::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Response of `POST /care-requests/care-provided`.
#[derive(Debug, Clone, Serialize)]
pub struct CareProvidedResponse {
    pub updated: Vec<CareProvidedReport>,
    pub skipped: Vec<SkippedReport>,
}

/// Query parameters of `GET /care-requests`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub since: Option<String>,
    pub until: Option<String>,
    /// Leading store rows to pass over before returning any.
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

/// Response of `GET /care-requests`.
#[derive(Debug, Clone, Serialize)]
pub struct CareRequestListResponse {
    pub data: Vec<CareRequest>,
    /// Rows the store returned that failed validation and were left out.
    pub dropped: usize,
}

/// API error response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
    /// Present when a patch sequence stopped part-way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<PartialUpdateContext>,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Which records were written before a patch sequence gave up.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartialUpdateContext {
    pub applied_record_ids: Vec<String>,
    pub unapplied_record_ids: Vec<String>,
}

impl From<&PatchAborted> for PartialUpdateContext {
    fn from(aborted: &PatchAborted) -> Self {
        Self {
            applied_record_ids: aborted.applied.iter().map(|o| o.record_id.clone()).collect(),
            unapplied_record_ids: aborted
                .unapplied
                .iter()
                .map(|o| o.record_id.clone())
                .collect(),
        }
    }
}

impl ApiError {
    fn new(message: &str, r#type: &str, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.to_string(),
                r#type: r#type.to_string(),
                param: None,
                code: Some(code.to_string()),
            },
            context: None,
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self::new(message, "invalid_request_error", "invalid_request_error")
    }

    /// Create an authentication error (401).
    pub fn unauthorized(message: &str) -> Self {
        Self::new(message, "authentication_error", "unauthorized")
    }

    /// Create a validation error (422).
    pub fn unprocessable(message: &str) -> Self {
        Self::new(message, "invalid_request_error", "unprocessable_entity")
    }

    /// Create a validation error (422) naming the offending parameter.
    pub fn unprocessable_param(message: &str, param: &str) -> Self {
        let mut error = Self::unprocessable(message);
        error.error.param = Some(param.to_string());
        error
    }

    /// Create a bad gateway error (502).
    pub fn bad_gateway(message: &str) -> Self {
        Self::new(message, "server_error", "bad_gateway")
    }

    /// Create a gateway timeout error (504).
    pub fn gateway_timeout(message: &str) -> Self {
        Self::new(message, "server_error", "gateway_timeout")
    }

    /// Create a service unavailable error (503).
    pub fn service_unavailable(message: &str) -> Self {
        Self::new(message, "server_error", "service_unavailable")
    }

    /// Get the HTTP status code for this error.
    fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("unauthorized") => StatusCode::UNAUTHORIZED,
            Some("unprocessable_entity") => StatusCode::UNPROCESSABLE_ENTITY,
            Some("bad_gateway") => StatusCode::BAD_GATEWAY,
            Some("gateway_timeout") => StatusCode::GATEWAY_TIMEOUT,
            Some("service_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Timeout(_) => ApiError::gateway_timeout(&error.to_string()),
            _ => ApiError::bad_gateway(&error.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(error: ReconcileError) -> Self {
        match error {
            ReconcileError::EmptyInput => ApiError::unprocessable(&error.to_string()),
            ReconcileError::Store(inner) => ApiError::from(inner),
            ReconcileError::RetryExhausted(ref aborted) => {
                let mut api_error = ApiError::service_unavailable(&format!(
                    "{}; possible partial update",
                    error
                ));
                api_error.context = Some(PartialUpdateContext::from(aborted));
                api_error
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::unprocessable(&e.body_text()),
            other => ApiError::bad_request(&other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PatchOperation;
    use serde_json::Map;

    fn op(id: &str) -> PatchOperation {
        PatchOperation {
            record_id: id.to_string(),
            field_updates: Map::new(),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::unprocessable("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::bad_gateway("x").status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::service_unavailable("x").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_empty_input_maps_to_422() {
        let error = ApiError::from(ReconcileError::EmptyInput);
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(error.context.is_none());
    }

    #[test]
    fn test_transport_failure_maps_to_502() {
        let error = ApiError::from(ReconcileError::Store(StoreError::Upstream {
            status: 500,
            message: "boom".to_string(),
        }));
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_retry_exhausted_maps_to_503_with_context() {
        let error = ApiError::from(ReconcileError::RetryExhausted(PatchAborted {
            applied: vec![op("rec1")],
            unapplied: vec![op("rec2"), op("rec3")],
            batch_index: 1,
            attempts: 6,
            last_error: StoreError::Upstream {
                status: 429,
                message: String::new(),
            },
        }));
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(error.error.message.contains("partial update"));
        let context = error.context.unwrap();
        assert_eq!(context.applied_record_ids, vec!["rec1"]);
        assert_eq!(context.unapplied_record_ids, vec!["rec2", "rec3"]);
    }

    #[test]
    fn test_error_serialization_omits_empty_context() {
        let json = serde_json::to_value(ApiError::unauthorized("Invalid API Key")).unwrap();
        assert_eq!(json["error"]["message"], "Invalid API Key");
        assert_eq!(json["error"]["code"], "unauthorized");
        assert!(json.get("context").is_none());
    }
}
