#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static Datastore Plugin
//!
//! Serves datastore reads from fixture data held in memory. Used by the
//! development server and by tests.
//!
//! ## Fixture format
//!
//! A JSON or YAML object. Keys may address a whole collection, one object
//! or one field:
//!
//! ```yaml
//! meeting:
//!   "1":
//!     enable_anonymous: true
//!     default_group_id: 5
//! group/5:
//!   permissions: ["agenda.can_see"]
//! agenda_item/1/meeting_id: 1
//! ```
//!
//! Every object that is mentioned gets an implicit `collection/id/id` field.
//!
//! ## Configuration
//!
//! ```yaml
//! datastore:
//!   kind: static
//!   fixture: ./fixtures/demo.yaml
//! ```

pub mod config;
pub mod domain;

pub use config::StaticDatastorePluginConfig;
pub use domain::{FixtureError, Service};
