use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::header::CONTENT_TYPE;
use permission_sdk::PermissionError;
use serde::Serialize;

/// Problem details body (RFC 9457) returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: &'static str,
    pub title: &'static str,
    pub status: u16,
    pub detail: String,
}

impl Problem {
    #[must_use]
    pub fn new(status: StatusCode, title: &'static str, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank",
            title,
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    /// Malformed request body.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid Request", detail)
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, [(CONTENT_TYPE, "application/problem+json")], Json(self)).into_response()
    }
}

/// Convert decision errors to HTTP Problem responses.
///
/// Retrieval and internal failures only carry a generic detail. The cause
/// was logged by the client.
#[must_use]
pub fn permission_error_to_problem(err: PermissionError) -> Problem {
    match err {
        PermissionError::UnknownRoute(message) => {
            Problem::new(StatusCode::BAD_REQUEST, "Unknown Route", message)
        }

        PermissionError::InvalidInput(message) => {
            Problem::new(StatusCode::BAD_REQUEST, "Invalid Input", message)
        }

        PermissionError::Cancelled => Problem::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Request Cancelled",
            "the request was cancelled before a decision was made",
        ),

        PermissionError::Retrieval(_) => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Retrieval Error",
            "the datastore could not be read",
        ),

        PermissionError::Internal(_) => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Error",
            "internal error",
        ),
    }
}

impl From<PermissionError> for Problem {
    fn from(e: PermissionError) -> Self {
        permission_error_to_problem(e)
    }
}
