//! Dispatch core: routes decisions to the registered policies.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use permission_sdk::{ActionName, DataProvider, FqField, Payload, Routes, UserId};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::checker::Decision;
use super::collections;
use super::datastore::Datastore;
use super::derivate::PermissionGraph;
use super::error::{DomainError, RegistryError};
use super::registry::{HandlerRegistry, RequestContext};

/// Collection that superusers do not see by default.
const PRIVATE_COLLECTION: &str = "personal_note";

/// Outcome of an action batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// The payload at `index` was denied. Later payloads were not checked.
    Denied { index: usize },
}

impl Verdict {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Permission service.
///
/// Holds the data provider, the implication graph and the handler registry.
/// All three are shared read-only between requests. Per request state lives
/// in a [`RequestContext`].
pub struct Service {
    provider: Arc<dyn DataProvider>,
    graph: Arc<PermissionGraph>,
    registry: HandlerRegistry,
}

impl Service {
    #[must_use]
    pub fn new(
        provider: Arc<dyn DataProvider>,
        graph: Arc<PermissionGraph>,
        registry: HandlerRegistry,
    ) -> Self {
        Self {
            provider,
            graph,
            registry,
        }
    }

    /// Service with the stock policies and implication graph.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if two policies claim the same route.
    pub fn with_default_handlers(provider: Arc<dyn DataProvider>) -> Result<Self, RegistryError> {
        Ok(Self::new(
            provider,
            Arc::new(PermissionGraph::openslides()),
            collections::default_registry()?,
        ))
    }

    fn context(&self, cancel: &CancellationToken) -> RequestContext {
        RequestContext::new(
            Datastore::new(Arc::clone(&self.provider), cancel.clone()),
            Arc::clone(&self.graph),
        )
    }

    /// Decides whether `user_id` may run the action `name` for every
    /// payload.
    ///
    /// Superusers are allowed for any action name without consulting a
    /// policy. Otherwise the payloads are checked strictly in order and the
    /// first denial ends the batch. An empty batch is allowed.
    ///
    /// # Errors
    ///
    /// - `InvalidActionName` if `name` is not `collection.verb`
    /// - `UnknownAction` if no policy handles `name`
    /// - `Action { index, .. }` if checking a payload failed
    #[tracing::instrument(
        skip_all,
        fields(action = name, user_id = user_id, payloads = payloads.len())
    )]
    pub async fn is_allowed(
        &self,
        cancel: &CancellationToken,
        name: &str,
        user_id: UserId,
        payloads: &[Payload],
    ) -> Result<Verdict, DomainError> {
        let ctx = self.context(cancel);
        if ctx.ds.is_superuser(user_id).await? {
            debug!("superuser is allowed");
            return Ok(Verdict::Allowed);
        }

        let action: ActionName = name.parse()?;
        let handler = self
            .registry
            .write_handler(action.as_str())
            .ok_or_else(|| DomainError::UnknownAction(name.to_owned()))?;

        for (index, payload) in payloads.iter().enumerate() {
            let decision = handler
                .is_allowed(&ctx, user_id, payload)
                .await
                .map_err(|e| e.in_action(index))?;

            if let Decision::Deny { reason } = decision {
                debug!(index, %reason, "action denied");
                return Ok(Verdict::Denied { index });
            }
        }
        Ok(Verdict::Allowed)
    }

    /// Decides for every fqfield whether `user_id` may read it.
    ///
    /// The result holds every requested fqfield. Fields are handed to the
    /// read handler of their collection sorted by id. Superusers see every
    /// field except user passwords, whether or not a policy handles the
    /// collection. Personal notes stay private for them.
    ///
    /// # Errors
    ///
    /// - `InvalidFqField` if an fqfield is malformed or not canonical
    /// - `UnknownCollection` if no policy handles a collection read by a
    ///   regular user
    /// - `Collection { name, .. }` if a read handler failed
    #[tracing::instrument(skip_all, fields(user_id = user_id, fqfields = fqfields.len()))]
    pub async fn restrict_fq_fields(
        &self,
        cancel: &CancellationToken,
        user_id: UserId,
        fqfields: &[String],
    ) -> Result<HashMap<String, bool>, DomainError> {
        let mut by_collection: BTreeMap<String, Vec<FqField>> = BTreeMap::new();
        for raw in fqfields {
            let fqfield: FqField = raw.parse()?;
            if fqfield.to_string() != *raw {
                return Err(DomainError::InvalidFqField(raw.clone()));
            }
            by_collection
                .entry(fqfield.collection.clone())
                .or_default()
                .push(fqfield);
        }

        let mut result: HashMap<String, bool> =
            fqfields.iter().map(|f| (f.clone(), false)).collect();
        if by_collection.is_empty() {
            return Ok(result);
        }

        let ctx = self.context(cancel);
        let superuser = ctx.ds.is_superuser(user_id).await?;

        for (collection, fields) in &mut by_collection {
            if superuser && collection != PRIVATE_COLLECTION {
                for fqfield in fields.iter() {
                    let password = collection == "user" && fqfield.field == "password";
                    result.insert(fqfield.to_string(), !password);
                }
                continue;
            }

            let handler = self
                .registry
                .read_handler(collection)
                .ok_or_else(|| DomainError::UnknownCollection(collection.clone()))?;

            fields.sort_unstable();
            fields.dedup();
            handler
                .restrict(&ctx, user_id, fields, &mut result)
                .await
                .map_err(|e| e.in_collection(collection))?;
        }

        debug!(
            visible = result.values().filter(|&&v| v).count(),
            "fields restricted"
        );
        Ok(result)
    }

    /// All registered read and write routes, sorted.
    #[must_use]
    pub fn all_routes(&self) -> Routes {
        self.registry.routes()
    }
}
