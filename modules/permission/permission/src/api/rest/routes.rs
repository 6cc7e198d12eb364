use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{Extension, Router};
use http::StatusCode;
use permission_sdk::PermissionClient;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;

/// Path prefix of every route.
pub const BASE_PATH: &str = "/internal/permission";

/// Shared by all handlers.
#[derive(Clone)]
pub struct RestState {
    pub client: Arc<dyn PermissionClient>,
    /// Cancelled on server shutdown. Every request works on a child token.
    pub shutdown: CancellationToken,
}

/// Builds the router of the permission REST API.
#[must_use]
pub fn router(state: RestState, request_timeout: Duration) -> Router {
    Router::new()
        // POST /internal/permission/is_allowed
        .route(&format!("{BASE_PATH}/is_allowed"), post(handlers::is_allowed))
        // POST /internal/permission/restrict_fq_fields
        .route(
            &format!("{BASE_PATH}/restrict_fq_fields"),
            post(handlers::restrict_fq_fields),
        )
        // GET /internal/permission/health
        .route(&format!("{BASE_PATH}/health"), get(handlers::health))
        .layer(Extension(state))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<axum::body::Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    module = "permission",
                )
            }),
        )
}
