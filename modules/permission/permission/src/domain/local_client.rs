//! Local (in-process) client for the permission service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{Payload, PermissionClient, PermissionError, Routes, UserId};
use tokio_util::sync::CancellationToken;

use super::{DomainError, Service};

/// Local client wrapping the service.
pub struct PermissionLocalClient {
    svc: Arc<Service>,
}

impl PermissionLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> PermissionError {
    let converted = PermissionError::from(e);
    if converted.is_client_error() {
        tracing::debug!(operation = op, error = %converted, "permission call rejected");
    } else {
        tracing::error!(operation = op, error = %converted, "permission call failed");
    }
    converted
}

#[async_trait]
impl PermissionClient for PermissionLocalClient {
    async fn is_allowed(
        &self,
        cancel: &CancellationToken,
        name: &str,
        user_id: UserId,
        payloads: Vec<Payload>,
    ) -> Result<bool, PermissionError> {
        self.svc
            .is_allowed(cancel, name, user_id, &payloads)
            .await
            .map(|verdict| verdict.is_allowed())
            .map_err(|e| log_and_convert("is_allowed", e))
    }

    async fn restrict_fq_fields(
        &self,
        cancel: &CancellationToken,
        user_id: UserId,
        fqfields: Vec<String>,
    ) -> Result<HashMap<String, bool>, PermissionError> {
        self.svc
            .restrict_fq_fields(cancel, user_id, &fqfields)
            .await
            .map_err(|e| log_and_convert("restrict_fq_fields", e))
    }

    fn all_routes(&self) -> Routes {
        self.svc.all_routes()
    }
}
