//! Domain layer for the static datastore plugin.

mod client;
pub mod service;

pub use service::{FixtureError, Service};
