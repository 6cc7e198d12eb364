//! Models shared between the permission module, its clients and its data sources.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Object id as used in fqfields.
pub type Id = u64;

/// User id. `0` is the anonymous user.
pub type UserId = Id;

/// The anonymous (not logged in) user.
pub const ANONYMOUS_USER_ID: UserId = 0;

/// One item of an action batch: field name to raw JSON value.
pub type Payload = HashMap<String, serde_json::Value>;

/// A fully qualified field: `collection/id/field` with a positive id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FqField {
    pub collection: String,
    pub id: Id,
    pub field: String,
}

impl FqField {
    #[must_use]
    pub fn new(collection: impl Into<String>, id: Id, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id,
            field: field.into(),
        }
    }

    /// The fully qualified id of the object this field belongs to.
    #[must_use]
    pub fn fqid(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for FqField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.collection, self.id, self.field)
    }
}

impl FromStr for FqField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(collection), Some(id), Some(field), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::FqField(s.to_owned()));
        };

        if collection.is_empty() || field.is_empty() {
            return Err(ParseError::FqField(s.to_owned()));
        }

        let id = id
            .parse::<Id>()
            .ok()
            .filter(|&id| id != 0)
            .ok_or_else(|| ParseError::FqField(s.to_owned()))?;

        Ok(Self::new(collection, id, field))
    }
}

/// An action name: `collection.verb`, e.g. `motion.update`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionName {
    name: String,
    dot: usize,
}

impl ActionName {
    /// The collection part (`motion` in `motion.update`).
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.name[..self.dot]
    }

    /// The verb part (`update` in `motion.update`).
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.name[self.dot + 1..]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for ActionName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(dot) = s.find('.') else {
            return Err(ParseError::ActionName(s.to_owned()));
        };

        let (collection, verb) = (&s[..dot], &s[dot + 1..]);
        if collection.is_empty() || verb.is_empty() || verb.contains('.') {
            return Err(ParseError::ActionName(s.to_owned()));
        }

        Ok(Self {
            name: s.to_owned(),
            dot,
        })
    }
}

/// All registered routes, for health reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routes {
    /// Collections with a read handler.
    pub read: Vec<String>,
    /// Action names with a write handler.
    pub write: Vec<String>,
}
