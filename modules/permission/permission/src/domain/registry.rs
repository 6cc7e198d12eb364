//! Handler registry: which policy answers which action or collection.
//!
//! Policies implement [`WriteChecker`] for actions and [`ReadChecker`] for
//! collections and register themselves through a [`Connecter`]. The registry
//! is built once at startup and only read afterwards.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{ActionName, FqField, Id, Payload, Routes, UserId};
use serde_json::Value;

use super::checker::{self, Decision};
use super::datastore::Datastore;
use super::derivate::PermissionGraph;
use super::error::{DomainError, RegistryError};
use super::perm::PermissionSet;

/// Everything a policy needs to answer one request.
#[derive(Clone)]
pub struct RequestContext {
    pub ds: Datastore,
    pub graph: Arc<PermissionGraph>,
}

impl RequestContext {
    #[must_use]
    pub fn new(ds: Datastore, graph: Arc<PermissionGraph>) -> Self {
        Self { ds, graph }
    }

    /// Runs the hierarchical check (see [`checker::ensure_perms`]).
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub async fn ensure(
        &self,
        user_id: UserId,
        meeting_id: Id,
        perms: &[&str],
    ) -> Result<Decision, DomainError> {
        checker::ensure_perms(&self.ds, &self.graph, user_id, meeting_id, perms).await
    }

    /// Resolves the permission set of the user in the meeting.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub async fn perms(
        &self,
        user_id: UserId,
        meeting_id: Id,
    ) -> Result<PermissionSet, DomainError> {
        PermissionSet::resolve(&self.ds, &self.graph, user_id, meeting_id).await
    }
}

/// Decides on one payload of a write action.
#[async_trait]
pub trait WriteChecker: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the payload is malformed or a read failed. A
    /// denial is `Ok(Decision::Deny { .. })`.
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError>;
}

/// Decides which fields of one collection a user may read.
#[async_trait]
pub trait ReadChecker: Send + Sync {
    /// Sets `result[fqfield] = true` for every visible field.
    ///
    /// `fqfields` all belong to the handler's collection and are sorted by
    /// id. Entries for invisible fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if a read failed.
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError>;
}

/// Registers a group of handlers.
pub trait Connecter: Send + Sync {
    /// # Errors
    ///
    /// Returns [`RegistryError`] if a route is already taken.
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError>;
}

/// Write handlers by action name and read handlers by collection.
#[derive(Default)]
pub struct HandlerRegistry {
    write: HashMap<String, Arc<dyn WriteChecker>>,
    read: HashMap<String, Arc<dyn ReadChecker>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from connecters.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] raised by a connecter.
    pub fn from_connecters<'a, I, C>(connecters: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = &'a C>,
        C: Connecter + ?Sized + 'a,
    {
        let mut registry = Self::new();
        for connecter in connecters {
            connecter.connect(&mut registry)?;
        }
        Ok(registry)
    }

    /// Registers the handler of an action.
    ///
    /// # Errors
    ///
    /// - `InvalidActionName` if `name` is not `collection.verb`
    /// - `DuplicateWriteHandler` if `name` already has a handler
    pub fn register_write(
        &mut self,
        name: &str,
        handler: Arc<dyn WriteChecker>,
    ) -> Result<(), RegistryError> {
        name.parse::<ActionName>()?;
        if self.write.contains_key(name) {
            return Err(RegistryError::DuplicateWriteHandler(name.to_owned()));
        }
        self.write.insert(name.to_owned(), handler);
        Ok(())
    }

    /// Registers the read handler of a collection.
    ///
    /// # Errors
    ///
    /// `DuplicateReadHandler` if `collection` already has a handler.
    pub fn register_read(
        &mut self,
        collection: &str,
        handler: Arc<dyn ReadChecker>,
    ) -> Result<(), RegistryError> {
        if self.read.contains_key(collection) {
            return Err(RegistryError::DuplicateReadHandler(collection.to_owned()));
        }
        self.read.insert(collection.to_owned(), handler);
        Ok(())
    }

    #[must_use]
    pub fn write_handler(&self, name: &str) -> Option<&Arc<dyn WriteChecker>> {
        self.write.get(name)
    }

    #[must_use]
    pub fn read_handler(&self, collection: &str) -> Option<&Arc<dyn ReadChecker>> {
        self.read.get(collection)
    }

    /// All registered routes, sorted.
    #[must_use]
    pub fn routes(&self) -> Routes {
        let mut read: Vec<String> = self.read.keys().cloned().collect();
        let mut write: Vec<String> = self.write.keys().cloned().collect();
        read.sort_unstable();
        write.sort_unstable();
        Routes { read, write }
    }
}

/// Splits fields sorted by id into one slice per object.
pub fn by_object(fqfields: &[FqField]) -> impl Iterator<Item = (Id, &[FqField])> {
    fqfields
        .chunk_by(|a, b| a.id == b.id)
        .filter_map(|chunk| chunk.first().map(|f| (f.id, chunk)))
}

/// Marks all `fqfields` visible if `visible` is set.
pub fn grant<S: BuildHasher>(
    result: &mut HashMap<String, bool, S>,
    fqfields: &[FqField],
    visible: bool,
) {
    if visible {
        for fqfield in fqfields {
            result.insert(fqfield.to_string(), true);
        }
    }
}

fn decode_id(field: &str, value: &Value) -> Result<Option<Id>, DomainError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| DomainError::invalid_payload(field, format!("`{n}` is not an id"))),
        Value::String(s) => s
            .trim()
            .parse::<Id>()
            .map(Some)
            .map_err(|_| DomainError::invalid_payload(field, format!("`{s}` is not an id"))),
        other => Err(DomainError::invalid_payload(
            field,
            format!("expected an id, got {other}"),
        )),
    }
}

/// Reads a required id from a payload.
///
/// Accepts a JSON number or a string holding a decimal integer.
///
/// # Errors
///
/// `InvalidPayload` if the field is absent or not an id.
pub fn payload_id(payload: &Payload, field: &str) -> Result<Id, DomainError> {
    payload_opt_id(payload, field)?
        .ok_or_else(|| DomainError::invalid_payload(field, "missing"))
}

/// Reads an optional id from a payload.
///
/// # Errors
///
/// `InvalidPayload` if the field is present but not an id.
pub fn payload_opt_id(payload: &Payload, field: &str) -> Result<Option<Id>, DomainError> {
    payload
        .get(field)
        .map_or(Ok(None), |value| decode_id(field, value))
}
