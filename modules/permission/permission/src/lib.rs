//! Permission Module
//!
//! Decides whether a user may run a write action and which fields of which
//! objects a user may read. Decisions are taken by object policies
//! registered per action and per collection, on top of meeting permissions
//! resolved from group membership and an implication graph.
//!
//! Provides the `PermissionClient` implementation for in-process callers
//! and the REST API under `/internal/permission`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod domain;
pub mod module;

pub use module::PermissionModule;
