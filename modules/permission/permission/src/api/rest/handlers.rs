use std::collections::HashMap;

use axum::Extension;
use axum::Json;
use axum::body::Bytes;
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use tracing::Span;
use tracing::field::Empty;

use super::dto::{HealthDto, IsAllowedRequest, RestrictFqFieldsRequest};
use super::error::Problem;
use super::routes::RestState;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Problem> {
    serde_json::from_slice(body).map_err(|e| Problem::bad_request(format!("invalid body: {e}")))
}

/// A JSON boolean followed by a newline.
fn bool_response(allowed: bool) -> Response {
    let body = if allowed { "true\n" } else { "false\n" };
    ([(CONTENT_TYPE, "application/json")], body).into_response()
}

/// Decide on an action batch
#[tracing::instrument(skip_all, fields(action = Empty, user_id = Empty, payloads = Empty))]
pub async fn is_allowed(
    Extension(state): Extension<RestState>,
    body: Bytes,
) -> Result<Response, Problem> {
    let req: IsAllowedRequest = parse_body(&body)?;
    let span = Span::current();
    span.record("action", req.name.as_str());
    span.record("user_id", req.user_id);
    span.record("payloads", req.data.len());

    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let allowed = state
        .client
        .is_allowed(&cancel, &req.name, req.user_id, req.data)
        .await?;
    Ok(bool_response(allowed))
}

/// Decide which fields a user may read
#[tracing::instrument(skip_all, fields(user_id = Empty, fqfields = Empty))]
pub async fn restrict_fq_fields(
    Extension(state): Extension<RestState>,
    body: Bytes,
) -> Result<Json<HashMap<String, bool>>, Problem> {
    let req: RestrictFqFieldsRequest = parse_body(&body)?;
    let span = Span::current();
    span.record("user_id", req.user_id);
    span.record("fqfields", req.fqfields.len());

    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = state
        .client
        .restrict_fq_fields(&cancel, req.user_id, req.fqfields)
        .await?;
    Ok(Json(result))
}

/// Registered routes
pub async fn health(Extension(state): Extension<RestState>) -> Json<HealthDto> {
    Json(HealthDto::from(state.client.all_routes()))
}
