//! # Public API
//!
//! Authenticated HTTP endpoints over the care-request record store.
//!
//! ## Endpoints
//!
//! - `GET /care-requests` - List care requests (`since`, `until`, `limit`)
//! - `POST /care-requests/care-provided` - Mark care requests as PROVIDED
//! - `GET /health` - Liveness (unauthenticated)
//! - `GET /metrics` - Prometheus metrics (unauthenticated)
//!
//! ## Example
//!
//! ```no_run
//! use care_shim::api::{create_router, AppState};
//! use care_shim::config::ShimConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(ShimConfig::default());
//! let state = Arc::new(AppState::new(config)?);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Errors share one envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "Invalid API Key",
//!     "type": "authentication_error",
//!     "code": "unauthorized"
//!   }
//! }
//! ```

pub mod auth;
mod care_provided;
mod care_requests;
mod health;
pub mod types;

pub use types::*;

use crate::config::ShimConfig;
use crate::logging::ShimRequestId;
use crate::metrics::PrometheusHandle;
use crate::store::{RecordStore, StoreError};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: Arc<ShimConfig>,
    pub store: RecordStore,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    /// Set when this process owns the global Prometheus recorder
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create application state with a fresh record store client.
    pub fn new(config: Arc<ShimConfig>) -> Result<Self, StoreError> {
        let store = RecordStore::new(&config.store)?;
        Ok(Self::with_store(config, store))
    }

    /// Create application state around an existing store client (for testing).
    pub fn with_store(config: Arc<ShimConfig>, store: RecordStore) -> Self {
        Self {
            config,
            store,
            start_time: Instant::now(),
            prometheus: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// Create the main API router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = state.config.server.request_timeout();
    let body_limit = state.config.server.max_body_bytes;

    let protected = Router::new()
        .route("/care-requests", get(care_requests::list))
        .route("/care-requests/care-provided", post(care_provided::handle))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .merge(protected)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(ShimRequestId))
        .with_state(state)
}
