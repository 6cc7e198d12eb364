//! Error types for the permission module.

use thiserror::Error;

/// Errors returned by the permission decision API.
///
/// A denied action or an invisible field is not an error: it is expressed
/// as `false` in the result.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The action or collection has no registered policy.
    #[error("unknown route: {0}")]
    UnknownRoute(String),

    /// The request is malformed (bad action name, bad fqfield, bad payload).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The datastore could not deliver a value.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The caller cancelled the request before a decision was made.
    #[error("request cancelled")]
    Cancelled,

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PermissionError {
    /// Returns `true` if the error was caused by the caller's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownRoute(_) | Self::InvalidInput(_))
    }
}

/// Errors a [`crate::DataProvider`] can report.
///
/// A missing field is not an error. It is reported as an empty slot.
#[derive(Debug, Clone, Error)]
pub enum DatastoreError {
    /// The datastore could not be reached.
    #[error("datastore unavailable: {0}")]
    Unavailable(String),

    /// The datastore answered with something that could not be understood.
    #[error("datastore protocol error: {0}")]
    Protocol(String),
}

/// Errors produced while parsing the models in [`crate::models`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid fqfield `{0}`: expected collection/id/field")]
    FqField(String),

    #[error("invalid action name `{0}`: expected collection.verb")]
    ActionName(String),
}
