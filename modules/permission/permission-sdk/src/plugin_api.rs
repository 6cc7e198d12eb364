//! Datastore API trait for data source implementations.

use async_trait::async_trait;

use crate::error::DatastoreError;

/// Read access to the datastore.
///
/// The permission module owns no data. Every fact it needs is fetched
/// through this trait.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetches the values of the given fqfields.
    ///
    /// The result has exactly one slot per requested fqfield, in request
    /// order. A field that does not exist yields `None`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the datastore cannot be reached
    /// - `Protocol` if the datastore answer is malformed
    async fn get(
        &self,
        fqfields: &[String],
    ) -> Result<Vec<Option<serde_json::Value>>, DatastoreError>;
}
