//! Permission module: wires the data provider, the stock policies and the
//! REST API together.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use permission_sdk::{DataProvider, PermissionClient};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::rest::{self, RestState};
use crate::domain::{PermissionLocalClient, RegistryError, Service};

/// Permission module.
///
/// Builds the [`Service`] once at startup. Route collisions between
/// policies abort the construction.
pub struct PermissionModule {
    client: Arc<dyn PermissionClient>,
}

impl PermissionModule {
    pub const MODULE_NAME: &'static str = "permission";

    /// # Errors
    ///
    /// Returns [`RegistryError`] if two stock policies claim the same route.
    #[tracing::instrument(skip_all)]
    pub fn new(provider: Arc<dyn DataProvider>) -> Result<Self, RegistryError> {
        let svc = Arc::new(Service::with_default_handlers(provider)?);
        let routes = svc.all_routes();
        info!(
            read_routes = routes.read.len(),
            write_routes = routes.write.len(),
            "{} module initialized",
            Self::MODULE_NAME
        );

        Ok(Self {
            client: Arc::new(PermissionLocalClient::new(svc)),
        })
    }

    /// The in-process decision API.
    #[must_use]
    pub fn client(&self) -> Arc<dyn PermissionClient> {
        Arc::clone(&self.client)
    }

    /// REST router. Requests in flight are cancelled with `shutdown`.
    #[must_use]
    pub fn router(&self, shutdown: CancellationToken, request_timeout: Duration) -> Router {
        rest::router(
            RestState {
                client: self.client(),
                shutdown,
            },
            request_timeout,
        )
    }
}
