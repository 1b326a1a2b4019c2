//! Request ID generation

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Generate a new request ID using UUID v4
///
/// # Examples
///
/// ```
/// use care_shim::logging::generate_request_id;
///
/// let request_id = generate_request_id();
/// assert_eq!(request_id.len(), 36);
/// ```
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Stamps each inbound request with an `x-request-id` unless one is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShimRequestId;

impl MakeRequestId for ShimRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&generate_request_id())
            .ok()
            .map(RequestId::new)
    }
}
