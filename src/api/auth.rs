//! API-key authentication.
//!
//! A key named `token` is accepted from a cookie, a request header, or the
//! query string, checked in that order against the trusted keys in
//! [`AuthConfig`](crate::config::AuthConfig).

use crate::api::{ApiError, AppState};
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Name of the cookie, header and query parameter carrying the key.
pub const API_KEY_NAME: &str = "token";

/// Reject the request with 401 unless it presents a trusted key.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let trusted = presented_keys(&request)
        .iter()
        .any(|key| state.config.auth.is_trusted(key));

    if trusted {
        Ok(next.run(request).await)
    } else {
        warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        Err(ApiError::unauthorized("Invalid API Key"))
    }
}

/// Candidate keys in precedence order: cookie, header, query.
fn presented_keys(request: &Request) -> Vec<String> {
    let mut keys = Vec::new();

    if let Some(cookie) = CookieJar::from_headers(request.headers()).get(API_KEY_NAME) {
        keys.push(cookie.value_trimmed().to_string());
    }

    if let Some(key) = request
        .headers()
        .get(API_KEY_NAME)
        .and_then(|v| v.to_str().ok())
    {
        keys.push(key.to_string());
    }

    if let Ok(Query(mut params)) = Query::<HashMap<String, String>>::try_from_uri(request.uri()) {
        if let Some(key) = params.remove(API_KEY_NAME) {
            keys.push(key);
        }
    }

    keys
}
