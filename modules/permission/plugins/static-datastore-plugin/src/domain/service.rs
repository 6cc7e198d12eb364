//! Service implementation for the static datastore plugin.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::config::StaticDatastorePluginConfig;

/// Errors while loading fixture data.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("reading fixture {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing fixture {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid fixture key `{0}`")]
    InvalidKey(String),

    #[error("fixture key `{key}` must map to an object")]
    NotAnObject { key: String },
}

/// Static datastore service.
///
/// Holds a flat map from fqfield to JSON value.
#[derive(Debug, Default, Clone)]
pub struct Service {
    data: HashMap<String, Value>,
}

impl Service {
    /// Creates a service from an already flat fqfield map.
    #[must_use]
    pub fn new(data: HashMap<String, Value>) -> Self {
        Self { data }
    }

    /// Creates a service from fixture data (see the crate docs for the format).
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] if a key or value does not follow the format.
    pub fn from_fixture(fixture: &Map<String, Value>) -> Result<Self, FixtureError> {
        let mut service = Self::default();
        service.extend(fixture)?;
        Ok(service)
    }

    /// Creates a service from plugin configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] if the fixture file cannot be read or parsed,
    /// or if the data does not follow the fixture format.
    pub fn from_config(cfg: &StaticDatastorePluginConfig) -> Result<Self, FixtureError> {
        let mut service = Self::default();
        if let Some(path) = &cfg.fixture {
            service.extend(&load_fixture_file(path)?)?;
        }
        service.extend(&cfg.data)?;

        info!(
            fixture = ?cfg.fixture,
            fields = service.data.len(),
            "Static datastore loaded"
        );
        Ok(service)
    }

    /// Adds fixture data. Existing fields are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] if a key or value does not follow the format.
    pub fn extend(&mut self, fixture: &Map<String, Value>) -> Result<(), FixtureError> {
        for (key, value) in fixture {
            let parts: Vec<&str> = key.split('/').collect();
            match parts.as_slice() {
                [collection] => {
                    let objects = as_object(key, value)?;
                    for (id, fields) in objects {
                        let id = parse_id(key, id)?;
                        self.insert_object(collection, id, as_object(key, fields)?);
                    }
                }
                [collection, id] => {
                    let id = parse_id(key, id)?;
                    self.insert_object(collection, id, as_object(key, value)?);
                }
                [collection, id, field] if !field.is_empty() => {
                    let id = parse_id(key, id)?;
                    self.data.insert(key.clone(), value.clone());
                    self.insert_id(collection, id);
                }
                _ => return Err(FixtureError::InvalidKey(key.clone())),
            }
        }
        Ok(())
    }

    /// Value of a single fqfield.
    #[must_use]
    pub fn get_field(&self, fqfield: &str) -> Option<&Value> {
        self.data.get(fqfield)
    }

    /// Number of stored fields, implicit `id` fields included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn insert_object(&mut self, collection: &str, id: u64, fields: &Map<String, Value>) {
        for (field, value) in fields {
            self.data
                .insert(format!("{collection}/{id}/{field}"), value.clone());
        }
        self.insert_id(collection, id);
    }

    fn insert_id(&mut self, collection: &str, id: u64) {
        self.data
            .entry(format!("{collection}/{id}/id"))
            .or_insert_with(|| Value::from(id));
    }
}

fn as_object<'a>(key: &str, value: &'a Value) -> Result<&'a Map<String, Value>, FixtureError> {
    value.as_object().ok_or_else(|| FixtureError::NotAnObject {
        key: key.to_owned(),
    })
}

fn parse_id(key: &str, id: &str) -> Result<u64, FixtureError> {
    id.parse()
        .map_err(|_| FixtureError::InvalidKey(key.to_owned()))
}

fn load_fixture_file(path: &Path) -> Result<Map<String, Value>, FixtureError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: display.clone(),
        source,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let value: Value = if is_yaml {
        serde_saphyr::from_str(&content).map_err(|e| FixtureError::Parse {
            path: display.clone(),
            reason: e.to_string(),
        })?
    } else {
        serde_json::from_str(&content).map_err(|e| FixtureError::Parse {
            path: display.clone(),
            reason: e.to_string(),
        })?
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(FixtureError::NotAnObject { key: display }),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn fixture(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn collection_keys_expand_to_fields() {
        let service = Service::from_fixture(&fixture(json!({
            "meeting": {"1": {"enable_anonymous": true, "default_group_id": 5}}
        })))
        .unwrap();

        assert_eq!(
            service.get_field("meeting/1/enable_anonymous"),
            Some(&json!(true))
        );
        assert_eq!(service.get_field("meeting/1/default_group_id"), Some(&json!(5)));
        assert_eq!(service.get_field("meeting/1/id"), Some(&json!(1)));
    }

    #[test]
    fn object_and_field_keys_add_implicit_id() {
        let service = Service::from_fixture(&fixture(json!({
            "group/5": {"permissions": ["agenda.can_see"]},
            "agenda_item/1/meeting_id": 1
        })))
        .unwrap();

        assert_eq!(
            service.get_field("group/5/permissions"),
            Some(&json!(["agenda.can_see"]))
        );
        assert_eq!(service.get_field("group/5/id"), Some(&json!(5)));
        assert_eq!(service.get_field("agenda_item/1/id"), Some(&json!(1)));
        assert_eq!(service.len(), 4);
    }

    #[test]
    fn invalid_keys_are_rejected() {
        for key in ["a/b/c/d", "motion/x", "motion/1/"] {
            let err = Service::from_fixture(&fixture(json!({ key: 1 }))).unwrap_err();
            assert!(matches!(err, FixtureError::InvalidKey(_)), "{key}: {err}");
        }
    }

    #[test]
    fn object_keys_require_objects() {
        let err = Service::from_fixture(&fixture(json!({"motion/1": 5}))).unwrap_err();
        assert!(matches!(err, FixtureError::NotAnObject { .. }));
    }

    #[test]
    fn config_loads_yaml_file_and_inline_data() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "meeting/1:\n  committee_id: 2\ncommittee/2/manager_ids: [7]"
        )
        .unwrap();

        let cfg = StaticDatastorePluginConfig {
            fixture: Some(file.path().to_path_buf()),
            data: fixture(json!({"committee/2/manager_ids": [8]})),
        };
        let service = Service::from_config(&cfg).unwrap();

        assert_eq!(service.get_field("meeting/1/committee_id"), Some(&json!(2)));
        assert_eq!(
            service.get_field("committee/2/manager_ids"),
            Some(&json!([8]))
        );
    }

    #[test]
    fn config_reports_missing_file() {
        let cfg = StaticDatastorePluginConfig {
            fixture: Some("/does/not/exist.json".into()),
            ..Default::default()
        };
        assert!(matches!(
            Service::from_config(&cfg),
            Err(FixtureError::Io { .. })
        ));
    }
}
