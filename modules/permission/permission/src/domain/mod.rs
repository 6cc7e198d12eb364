//! Domain layer for the permission module.

pub mod checker;
pub mod collections;
pub mod datastore;
pub mod derivate;
pub mod error;
pub mod local_client;
pub mod perm;
pub mod registry;
pub mod service;

#[cfg(test)]
mod testing;

pub use checker::Decision;
pub use datastore::{Datastore, OrganisationLevel};
pub use derivate::PermissionGraph;
pub use error::{DomainError, RegistryError};
pub use local_client::PermissionLocalClient;
pub use perm::PermissionSet;
pub use registry::{Connecter, HandlerRegistry, ReadChecker, RequestContext, WriteChecker};
pub use service::{Service, Verdict};
