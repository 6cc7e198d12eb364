#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Permission SDK
//!
//! This crate provides the public contracts of the `permission` module:
//!
//! - [`PermissionClient`] - Decision API for consumers (action checks and field restriction)
//! - [`DataProvider`] - Datastore API implemented by data sources
//! - [`FqField`], [`ActionName`], [`Payload`], [`Routes`] - Models
//! - [`PermissionError`], [`DatastoreError`], [`ParseError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use permission_sdk::PermissionClient;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//!
//! // Can user 7 delete motion 3?
//! let payload = serde_json::from_str(r#"{"id": 3}"#)?;
//! let allowed = client
//!     .is_allowed(&cancel, "motion.delete", 7, vec![payload])
//!     .await?;
//!
//! // Which of these fields may user 7 read?
//! let visible = client
//!     .restrict_fq_fields(&cancel, 7, vec!["motion/3/title".to_owned()])
//!     .await?;
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod plugin_api;

pub use api::PermissionClient;
pub use error::{DatastoreError, ParseError, PermissionError};
pub use models::{ANONYMOUS_USER_ID, ActionName, FqField, Id, Payload, Routes, UserId};
pub use plugin_api::DataProvider;
