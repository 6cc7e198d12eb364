//! Public API trait for the permission module.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PermissionError;
use crate::models::{Payload, Routes, UserId};

/// Public decision API.
///
/// Consumed by the REST layer and by in-process callers:
///
/// ```ignore
/// let allowed = client
///     .is_allowed(&cancel, "topic.create", user_id, payloads)
///     .await?;
/// ```
///
/// Cancelling `cancel` aborts all pending datastore reads. The call then
/// returns [`PermissionError::Cancelled`], never a denial.
#[async_trait]
pub trait PermissionClient: Send + Sync {
    /// Tells whether `user_id` may run the action `name` for every payload.
    ///
    /// Superusers are allowed for any `name`. Otherwise payloads are checked
    /// in order. The first denied payload makes the whole batch denied and
    /// the remaining payloads are not looked at. The index of the denied
    /// payload is not part of the answer; it is logged at `debug` level
    /// (`action denied`, field `index`). A failing payload reports its index
    /// in the error message.
    ///
    /// # Errors
    ///
    /// - `UnknownRoute` if no policy handles `name` (never for superusers)
    /// - `InvalidInput` if `name` or a payload is malformed (never for
    ///   superusers)
    /// - `Retrieval` if the datastore failed
    /// - `Cancelled` if `cancel` fired
    async fn is_allowed(
        &self,
        cancel: &CancellationToken,
        name: &str,
        user_id: UserId,
        payloads: Vec<Payload>,
    ) -> Result<bool, PermissionError>;

    /// Tells for every fqfield whether `user_id` may read it.
    ///
    /// The returned map has one entry per requested fqfield.
    ///
    /// # Errors
    ///
    /// - `UnknownRoute` if no policy handles one of the collections (never
    ///   for superusers)
    /// - `InvalidInput` if an fqfield is malformed
    /// - `Retrieval` if the datastore failed
    /// - `Cancelled` if `cancel` fired
    async fn restrict_fq_fields(
        &self,
        cancel: &CancellationToken,
        user_id: UserId,
        fqfields: Vec<String>,
    ) -> Result<HashMap<String, bool>, PermissionError>;

    /// Names of all registered read and write routes.
    fn all_routes(&self) -> Routes;
}
