//! Configuration for the static datastore plugin.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Plugin configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticDatastorePluginConfig {
    /// Fixture file to load (`.json`, `.yaml` or `.yml`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,

    /// Inline fixture data. Applied after the fixture file, so inline keys win.
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
}
