//! Client implementation for the static datastore plugin.

use async_trait::async_trait;
use permission_sdk::{DataProvider, DatastoreError};
use serde_json::Value;

use super::service::Service;

#[async_trait]
impl DataProvider for Service {
    async fn get(&self, fqfields: &[String]) -> Result<Vec<Option<Value>>, DatastoreError> {
        Ok(fqfields
            .iter()
            .map(|fqfield| self.get_field(fqfield).cloned())
            .collect())
    }
}
