//! Domain errors for the permission module.

use permission_sdk::{DatastoreError, ParseError, PermissionError};

/// Internal domain errors.
///
/// A denial is never an error. Policies answer with
/// [`super::checker::Decision`] and the dispatch core with
/// [`super::service::Verdict`].
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("unknown action `{0}`")]
    UnknownAction(String),

    #[error("unknown collection `{0}`")]
    UnknownCollection(String),

    #[error("invalid action name `{0}`")]
    InvalidActionName(String),

    #[error("invalid fqfield `{0}`")]
    InvalidFqField(String),

    #[error("invalid payload field `{field}`: {reason}")]
    InvalidPayload { field: String, reason: String },

    #[error("{0} does not exist")]
    DoesNotExist(String),

    #[error("decoding {fqfield}: {reason}")]
    Decode { fqfield: String, reason: String },

    #[error("fetching {fqfield}: {source}")]
    Datastore {
        fqfield: String,
        #[source]
        source: DatastoreError,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("payload {index}: {source}")]
    Action {
        index: usize,
        #[source]
        source: Box<DomainError>,
    },

    #[error("collection {name}: {source}")]
    Collection {
        name: String,
        #[source]
        source: Box<DomainError>,
    },
}

impl DomainError {
    #[must_use]
    pub fn invalid_payload(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    /// Wraps the error with the index of the failing batch item.
    #[must_use]
    pub fn in_action(self, index: usize) -> Self {
        Self::Action {
            index,
            source: Box::new(self),
        }
    }

    /// Wraps the error with the collection whose read handler failed.
    #[must_use]
    pub fn in_collection(self, name: &str) -> Self {
        Self::Collection {
            name: name.to_owned(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context wrappers removed.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Action { source, .. } | Self::Collection { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns `true` if the error means that a requested object is absent.
    #[must_use]
    pub fn is_does_not_exist(&self) -> bool {
        matches!(self.root(), Self::DoesNotExist(_))
    }
}

impl From<ParseError> for DomainError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::FqField(s) => Self::InvalidFqField(s),
            ParseError::ActionName(s) => Self::InvalidActionName(s),
        }
    }
}

impl From<DomainError> for PermissionError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e.root() {
            DomainError::UnknownAction(_) | DomainError::UnknownCollection(_) => {
                Self::UnknownRoute(message)
            }
            DomainError::InvalidActionName(_)
            | DomainError::InvalidFqField(_)
            | DomainError::InvalidPayload { .. }
            | DomainError::DoesNotExist(_) => Self::InvalidInput(message),
            DomainError::Decode { .. } | DomainError::Datastore { .. } => {
                Self::Retrieval(message)
            }
            DomainError::Cancelled => Self::Cancelled,
            DomainError::Action { .. } | DomainError::Collection { .. } => Self::Internal(message),
        }
    }
}

/// Errors raised while building the handler registry.
///
/// They are startup errors: the service is never constructed with a
/// conflicting registry.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("write handler for `{0}` registered twice")]
    DuplicateWriteHandler(String),

    #[error("read handler for `{0}` registered twice")]
    DuplicateReadHandler(String),

    #[error(transparent)]
    InvalidActionName(#[from] ParseError),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_public_kind() {
        let err = DomainError::Cancelled.in_action(2);
        assert!(matches!(
            PermissionError::from(err),
            PermissionError::Cancelled
        ));

        let err = DomainError::UnknownCollection("nope".to_owned()).in_collection("nope");
        assert!(matches!(
            PermissionError::from(err),
            PermissionError::UnknownRoute(_)
        ));
    }

    #[test]
    fn datastore_failures_are_retrieval_errors() {
        let err = DomainError::Datastore {
            fqfield: "meeting/1/id".to_owned(),
            source: DatastoreError::Unavailable("connection refused".to_owned()),
        }
        .in_action(0);

        let public = PermissionError::from(err);
        assert!(matches!(public, PermissionError::Retrieval(_)));
        assert!(public.to_string().contains("payload 0"));
        assert!(!public.is_client_error());
    }

    #[test]
    fn absence_is_detected_through_wrappers() {
        let err = DomainError::DoesNotExist("motion/4".to_owned()).in_action(0);
        assert!(err.is_does_not_exist());
        assert!(!DomainError::Cancelled.is_does_not_exist());
    }

    #[test]
    fn parse_errors_map_to_their_kind() {
        assert!(matches!(
            DomainError::from(ParseError::FqField("x".to_owned())),
            DomainError::InvalidFqField(_)
        ));
        assert!(matches!(
            DomainError::from(ParseError::ActionName("x".to_owned())),
            DomainError::InvalidActionName(_)
        ));
    }
}
