//! Test helpers shared by the domain unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{DataProvider, DatastoreError};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::datastore::Datastore;

/// Static data provider loaded from a `json!` fixture.
pub fn provider(fixture: Value) -> Arc<dyn DataProvider> {
    let Value::Object(fixture) = fixture else {
        panic!("fixture must be an object");
    };
    Arc::new(static_datastore_plugin::Service::from_fixture(&fixture).unwrap())
}

/// Datastore facade over a `json!` fixture with a fresh token.
pub fn datastore(fixture: Value) -> Datastore {
    Datastore::new(provider(fixture), CancellationToken::new())
}

/// Provider whose reads never complete.
pub struct PendingProvider;

#[async_trait]
impl DataProvider for PendingProvider {
    async fn get(&self, _fqfields: &[String]) -> Result<Vec<Option<Value>>, DatastoreError> {
        std::future::pending().await
    }
}
